/// Error types for the hub subsystem
///
/// Every variant except `Encode` is fatal to exactly one connection and is
/// handled by unregistering it; none of them propagate to other connections
/// or to a hub's control loop.
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Read deadline exceeded ({0:?} without pong)")]
    ReadTimeout(Duration),

    #[error("Write deadline exceeded ({0:?})")]
    WriteTimeout(Duration),

    #[error("Message too large: {size} bytes (limit {limit})")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Hub for room '{0}' is closed")]
    HubClosed(String),

    #[error("Packet encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl HubError {
    /// True for failures caused by the peer or the wire rather than the hub
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            HubError::Transport(_)
                | HubError::ReadTimeout(_)
                | HubError::WriteTimeout(_)
                | HubError::MessageTooLarge { .. }
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for HubError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::error::{CapacityError, Error};

        match e {
            // Raised from the frame header, before the payload is buffered
            Error::Capacity(CapacityError::MessageTooLong { size, max_size }) => {
                HubError::MessageTooLarge {
                    size,
                    limit: max_size,
                }
            }
            other => HubError::Transport(other.to_string()),
        }
    }
}

#[cfg(feature = "web")]
impl From<axum::Error> for HubError {
    fn from(e: axum::Error) -> Self {
        HubError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
