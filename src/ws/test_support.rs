//! Shared helpers for hub tests: in-memory socket pairs and polling waits

use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::config::HubConfig;
use crate::errors::Result;

use super::message::{parse_packet, Payload};
use super::registry::HubRegistry;
use super::transport::websocket_config;

pub(crate) type ClientSocket = WebSocketStream<DuplexStream>;

/// How long a helper waits for a single expected message
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Defaults with timeouts short enough that a stuck test fails quickly
pub(crate) fn test_config() -> HubConfig {
    HubConfig {
        write_timeout_ms: 1_000,
        read_timeout_ms: 5_000,
        ping_interval_ms: 4_500,
        ..HubConfig::default()
    }
}

/// Connected server/client websocket pair over an in-memory pipe
///
/// `buffer` bounds how many bytes can be in flight in each direction, so a
/// small value models a client that stops reading. The server side enforces
/// `config`'s message size limit.
pub(crate) async fn socket_pair(
    buffer: usize,
    config: &HubConfig,
) -> (WebSocketStream<DuplexStream>, ClientSocket) {
    let (server_io, client_io) = tokio::io::duplex(buffer);
    let server =
        WebSocketStream::from_raw_socket(server_io, Role::Server, Some(websocket_config(config)))
            .await;
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    (server, client)
}

/// Attach a fresh client to `room` on a background task
pub(crate) async fn spawn_attach(
    registry: &Arc<HubRegistry>,
    room: &str,
    buffer: usize,
) -> (JoinHandle<Result<()>>, ClientSocket) {
    let (server, client) = socket_pair(buffer, registry.config()).await;
    let registry = Arc::clone(registry);
    let room = room.to_string();
    let attached = tokio::spawn(async move { registry.attach(server, &room).await });
    (attached, client)
}

/// Next relayed text message, skipping hub notifications and control frames
pub(crate) async fn next_chat(client: &mut ClientSocket) -> Option<String> {
    with_timeout(async {
        while let Some(Ok(message)) = client.next().await {
            if let Message::Text(text) = message {
                if parse_packet(&text).is_none() {
                    return Some(text);
                }
            }
        }
        None
    })
    .await
}

/// True once a close frame arrives
pub(crate) async fn next_close(client: &mut ClientSocket) -> bool {
    with_timeout(async {
        while let Some(Ok(message)) = client.next().await {
            if let Message::Close(_) = message {
                return Some(true);
            }
        }
        None
    })
    .await
    .unwrap_or(false)
}

/// Next payload from an outbound mailbox
pub(crate) async fn recv_payload(outbound: &mut mpsc::Receiver<Payload>) -> Option<Payload> {
    with_timeout(outbound.recv()).await
}

/// Next non-notification text payload from an outbound mailbox
pub(crate) async fn recv_chat(outbound: &mut mpsc::Receiver<Payload>) -> Option<String> {
    with_timeout(async {
        while let Some(payload) = outbound.recv().await {
            if let Payload::Text(text) = payload {
                if parse_packet(&text).is_none() {
                    return Some(text.to_string());
                }
            }
        }
        None
    })
    .await
}

/// Poll `condition` every 10ms until it holds or `limit` elapses
pub(crate) async fn wait_until(condition: impl Fn() -> bool, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn with_timeout<T>(future: impl Future<Output = Option<T>>) -> Option<T> {
    tokio::time::timeout(RECV_TIMEOUT, future).await.ok().flatten()
}
