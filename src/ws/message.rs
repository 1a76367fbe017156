/// Hub message types - opaque payloads and the packet envelope
///
/// Client traffic is relayed as an opaque `Payload`; the hub never looks
/// inside. Hub-originated notifications are JSON packets of the form
/// `{"Event": "<name>", "Data": <value>}`.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::transport::Frame;
use crate::errors::Result;

// ============================================================================
// EVENT NAMES
// ============================================================================

/// Human-readable membership line, sent after a client joins
pub const EVENT_NEW_CONNECTION: &str = "new_connection";

/// Human-readable membership line, sent after a client leaves
pub const EVENT_LOST_CONNECTION: &str = "lost_connection";

/// Numeric member count, sent after every membership change
pub const EVENT_NUM_CONNECTIONS: &str = "num_connections";

// ============================================================================
// PAYLOAD
// ============================================================================

/// An opaque message relayed to every member of a room
///
/// Cloning is a reference-count bump, so one payload can be queued to many
/// connections without copying its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(Arc<str>),
    Binary(Arc<[u8]>),
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Payload::Text(Arc::from(text))
    }

    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        Payload::Binary(Arc::from(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the data frame that carries this payload to a client
    pub fn to_frame(&self) -> Frame {
        match self {
            Payload::Text(text) => Frame::Text(text.to_string()),
            Payload::Binary(data) => Frame::Binary(data.to_vec()),
        }
    }

    /// Extract a payload from a client data frame; control frames yield None
    pub fn from_frame(frame: Frame) -> Option<Self> {
        match frame {
            Frame::Text(text) => Some(Payload::text(text)),
            Frame::Binary(data) => Some(Payload::binary(data)),
            Frame::Ping(_) | Frame::Pong(_) | Frame::Close => None,
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Payload::binary(data)
    }
}

// ============================================================================
// PACKET ENVELOPE
// ============================================================================

/// Named event envelope used for hub notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet<T> {
    #[serde(rename = "Event")]
    pub event: String,

    #[serde(rename = "Data")]
    pub data: T,
}

impl<T: Serialize> Packet<T> {
    pub fn new(event: impl Into<String>, data: T) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Encode as a text payload ready for broadcast
    pub fn to_payload(&self) -> Result<Payload> {
        Ok(Payload::text(serde_json::to_string(self)?))
    }
}

/// Encode `{"Event": event, "Data": data}` as JSON bytes
pub fn packetize<T: Serialize>(event: &str, data: T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&Packet::new(event, data))?)
}

/// Parse a text payload as a packet with an arbitrary data value
///
/// Returns None for anything that is not a packet, which is how clients
/// tell relayed chat traffic apart from hub notifications.
pub fn parse_packet(text: &str) -> Option<Packet<serde_json::Value>> {
    serde_json::from_str(text).ok()
}
