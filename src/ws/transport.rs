/// Transport boundary between the hub and a websocket implementation
///
/// A `Transport` is a freshly upgraded full-duplex socket. The hub splits
/// it once: the sink half goes to the connection's writer task and the
/// source half is driven by the reader loop. Adapters are provided for
/// `tokio_tungstenite::WebSocketStream` over any async byte stream and, with
/// the `web` feature, for axum's `WebSocket`.
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tokio_tungstenite::WebSocketStream;

use crate::config::HubConfig;
use crate::errors::{HubError, Result};

/// A single websocket frame as seen by the hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

impl Frame {
    /// Payload length in bytes
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) | Frame::Ping(data) | Frame::Pong(data) => data.len(),
            Frame::Close => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write half of a transport
#[async_trait]
pub trait FrameSink: Send + 'static {
    async fn send_frame(&mut self, frame: Frame) -> Result<()>;
}

/// Read half of a transport
///
/// `None` means the peer closed the stream.
#[async_trait]
pub trait FrameSource: Send + 'static {
    async fn next_frame(&mut self) -> Option<Result<Frame>>;
}

/// A full-duplex socket that can be split into independent halves
pub trait Transport: Send + 'static {
    type Sink: FrameSink;
    type Source: FrameSource;

    fn split(self) -> (Self::Sink, Self::Source);
}

// ============================================================================
// TOKIO-TUNGSTENITE ADAPTER
// ============================================================================

/// Stream settings enforcing the hub's message size limit
///
/// Pass to `accept_async_with_config` or `WebSocketStream::from_raw_socket`.
/// Tungstenite then rejects an oversized frame from its header, before any
/// payload is buffered.
pub fn websocket_config(config: &HubConfig) -> WebSocketConfig {
    WebSocketConfig {
        max_message_size: Some(config.max_message_size),
        max_frame_size: Some(config.max_message_size),
        ..WebSocketConfig::default()
    }
}

impl From<Frame> for TungsteniteMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => TungsteniteMessage::Text(text),
            Frame::Binary(data) => TungsteniteMessage::Binary(data),
            Frame::Ping(data) => TungsteniteMessage::Ping(data),
            Frame::Pong(data) => TungsteniteMessage::Pong(data),
            Frame::Close => TungsteniteMessage::Close(None),
        }
    }
}

/// Map a tungstenite message to a frame; raw frames are not surfaced
fn frame_from_tungstenite(message: TungsteniteMessage) -> Option<Frame> {
    match message {
        TungsteniteMessage::Text(text) => Some(Frame::Text(text)),
        TungsteniteMessage::Binary(data) => Some(Frame::Binary(data)),
        TungsteniteMessage::Ping(data) => Some(Frame::Ping(data)),
        TungsteniteMessage::Pong(data) => Some(Frame::Pong(data)),
        TungsteniteMessage::Close(_) => Some(Frame::Close),
        TungsteniteMessage::Frame(_) => None,
    }
}

pub struct TungsteniteSink<S>(SplitSink<WebSocketStream<S>, TungsteniteMessage>);

pub struct TungsteniteSource<S>(SplitStream<WebSocketStream<S>>);

#[async_trait]
impl<S> FrameSink for TungsteniteSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        self.0.send(frame.into()).await.map_err(HubError::from)
    }
}

#[async_trait]
impl<S> FrameSource for TungsteniteSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            match self.0.next().await? {
                Ok(message) => {
                    if let Some(frame) = frame_from_tungstenite(message) {
                        return Some(Ok(frame));
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

impl<S> Transport for WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Sink = TungsteniteSink<S>;
    type Source = TungsteniteSource<S>;

    fn split(self) -> (Self::Sink, Self::Source) {
        let (sink, source) = StreamExt::split(self);
        (TungsteniteSink(sink), TungsteniteSource(source))
    }
}

// ============================================================================
// AXUM ADAPTER
// ============================================================================

#[cfg(feature = "web")]
mod axum_adapter {
    use super::*;
    use axum::extract::ws::{Message, WebSocket};

    impl From<Frame> for Message {
        fn from(frame: Frame) -> Self {
            match frame {
                Frame::Text(text) => Message::Text(text),
                Frame::Binary(data) => Message::Binary(data),
                Frame::Ping(data) => Message::Ping(data),
                Frame::Pong(data) => Message::Pong(data),
                Frame::Close => Message::Close(None),
            }
        }
    }

    impl From<Message> for Frame {
        fn from(message: Message) -> Self {
            match message {
                Message::Text(text) => Frame::Text(text),
                Message::Binary(data) => Frame::Binary(data),
                Message::Ping(data) => Frame::Ping(data),
                Message::Pong(data) => Frame::Pong(data),
                Message::Close(_) => Frame::Close,
            }
        }
    }

    pub struct AxumSink(SplitSink<WebSocket, Message>);

    pub struct AxumSource(SplitStream<WebSocket>);

    #[async_trait]
    impl FrameSink for AxumSink {
        async fn send_frame(&mut self, frame: Frame) -> Result<()> {
            self.0.send(frame.into()).await.map_err(HubError::from)
        }
    }

    #[async_trait]
    impl FrameSource for AxumSource {
        async fn next_frame(&mut self) -> Option<Result<Frame>> {
            self.0
                .next()
                .await
                .map(|message| message.map(Frame::from).map_err(HubError::from))
        }
    }

    impl Transport for WebSocket {
        type Sink = AxumSink;
        type Source = AxumSource;

        fn split(self) -> (Self::Sink, Self::Source) {
            let (sink, source) = StreamExt::split(self);
            (AxumSink(sink), AxumSource(source))
        }
    }
}

#[cfg(feature = "web")]
pub use axum_adapter::{AxumSink, AxumSource};
