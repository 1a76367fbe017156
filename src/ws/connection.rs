/// WebSocket connection handler
///
/// A connection is one client attached to one hub. It owns:
/// - A bounded outbound mailbox drained by its writer task
/// - A liveness flag guarding every enqueue and the eviction transition
/// - A close signal observed by its reader loop
///
/// The hub is the only party that closes a connection (on unregister);
/// everyone else asks the hub to unregister it.
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::{
    config::HubConfig,
    errors::{HubError, Result},
    logger::{self, LogTag},
};

use super::{
    health::{ping_ticker, ConnectionHealth},
    hub::Hub,
    message::Payload,
    transport::{Frame, FrameSink, FrameSource},
};

// ============================================================================
// CONNECTION ID
// ============================================================================

/// Process-unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// CONNECTION
// ============================================================================

/// Result of offering a payload to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Payload placed on the outbound mailbox
    Queued,
    /// Connection already closed or being evicted; payload dropped
    Dead,
    /// Mailbox was full or closed; unregister has been requested
    Evicted,
}

#[derive(Debug)]
struct Liveness {
    dead: bool,
    evicting: bool,
    outbound: Option<mpsc::Sender<Payload>>,
}

#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    state: Mutex<Liveness>,
    closed_tx: watch::Sender<bool>,
}

impl Connection {
    /// Create a connection and the receiving end of its outbound mailbox
    pub fn new(outbound_capacity: usize) -> (Arc<Self>, mpsc::Receiver<Payload>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(outbound_capacity.max(1));
        let (closed_tx, _) = watch::channel(false);

        let connection = Arc::new(Self {
            id: ConnectionId::next(),
            state: Mutex::new(Liveness {
                dead: false,
                evicting: false,
                outbound: Some(outbound_tx),
            }),
            closed_tx,
        });

        (connection, outbound_rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// True once the hub has closed this connection
    pub fn is_dead(&self) -> bool {
        self.state.lock().dead
    }

    /// Offer a payload without blocking
    ///
    /// A full or closed mailbox evicts the connection: the first such send
    /// asks `hub` to unregister it and every later send is dropped.
    pub fn send(self: &Arc<Self>, payload: Payload, hub: &Hub) -> SendOutcome {
        let mut state = self.state.lock();
        if state.dead || state.evicting {
            return SendOutcome::Dead;
        }
        let Some(outbound) = state.outbound.as_ref() else {
            return SendOutcome::Dead;
        };

        let reason = match outbound.try_send(payload) {
            Ok(()) => return SendOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => "outbound queue full",
            Err(mpsc::error::TrySendError::Closed(_)) => "writer gone",
        };
        state.evicting = true;
        drop(state);

        logger::warning(
            LogTag::Connection,
            &format!("Evicting {} from hub {} ({})", self.id, hub.id(), reason),
        );
        hub.unregister(Arc::clone(self));
        SendOutcome::Evicted
    }

    /// Close the connection; returns false if it was already closed
    ///
    /// Drops the outbound sender and raises the close signal. The writer
    /// abandons whatever is still queued, sends a close frame and stops; the
    /// reader stops as well.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.state.lock();
        if state.dead {
            return false;
        }
        state.dead = true;
        state.outbound = None;
        drop(state);

        self.closed_tx.send_replace(true);
        true
    }

    fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed_tx.subscribe()
    }

    // ========================================================================
    // READ LOOP
    // ========================================================================

    /// Read frames from the client until the connection ends
    ///
    /// Text and binary frames are forwarded to `hub` for broadcast. Only a
    /// pong extends the read deadline. Returns Ok on a clean close (peer
    /// closed, or the hub closed this connection) and Err for timeouts,
    /// oversized frames and transport failures.
    pub(crate) async fn read_loop<R: FrameSource>(
        &self,
        mut source: R,
        hub: &Hub,
        config: &HubConfig,
    ) -> Result<()> {
        let mut health = ConnectionHealth::new(config.read_timeout());
        let mut closed = self.closed_signal();

        loop {
            let next = tokio::select! {
                next = source.next_frame() => next,
                _ = tokio::time::sleep_until(health.deadline()) => {
                    logger::debug(
                        LogTag::Keepalive,
                        &format!(
                            "{} missed its pong ({}ms since last, {} received)",
                            self.id,
                            health.millis_since_pong(),
                            health.pongs_received()
                        ),
                    );
                    return Err(HubError::ReadTimeout(health.read_timeout()));
                }
                _ = wait_closed(&mut closed) => return Ok(()),
            };

            let frame = match next {
                None => return Ok(()),
                Some(frame) => frame?,
            };

            match frame {
                Frame::Pong(_) => {
                    health.record_pong();
                    logger::verbose(LogTag::Keepalive, &format!("Pong from {}", self.id));
                }
                // Pings are answered by the transport
                Frame::Ping(_) => {}
                Frame::Close => return Ok(()),
                data => {
                    let size = data.len();
                    if size > config.max_message_size {
                        return Err(HubError::MessageTooLarge {
                            size,
                            limit: config.max_message_size,
                        });
                    }
                    let Some(payload) = Payload::from_frame(data) else {
                        continue;
                    };

                    tokio::select! {
                        sent = hub.broadcast(payload) => sent?,
                        _ = wait_closed(&mut closed) => return Ok(()),
                    }
                }
            }
        }
    }

    // ========================================================================
    // WRITE LOOP
    // ========================================================================

    /// Drain the outbound mailbox to the client and send keepalive pings
    ///
    /// Once the connection is closed nothing more is written from the
    /// mailbox: the writer sends a close frame and stops, even mid-write.
    pub(crate) async fn write_loop<W: FrameSink>(
        &self,
        mut sink: W,
        mut outbound: mpsc::Receiver<Payload>,
        config: &HubConfig,
    ) -> Result<()> {
        let write_timeout = config.write_timeout();
        let mut ticker = ping_ticker(config.ping_interval());
        let mut closed = self.closed_signal();

        loop {
            tokio::select! {
                next = outbound.recv() => match next {
                    Some(payload) if !self.is_dead() => {
                        tokio::select! {
                            written = write_frame(&mut sink, payload.to_frame(), write_timeout) => written?,
                            _ = wait_closed(&mut closed) => {}
                        }
                    }
                    _ => break,
                },
                _ = ticker.tick() => {
                    write_frame(&mut sink, Frame::Ping(Vec::new()), write_timeout).await?;
                    logger::verbose(LogTag::Keepalive, &format!("Ping to {}", self.id));
                }
                _ = wait_closed(&mut closed) => break,
            }
        }

        let discarded = outbound.len();
        // Peer may already be gone; the close frame is best effort
        let _ = write_frame(&mut sink, Frame::Close, write_timeout).await;
        logger::debug(
            LogTag::Connection,
            &format!(
                "{} closed, writer finished ({} queued messages discarded)",
                self.id, discarded
            ),
        );
        Ok(())
    }
}

/// Write one frame, bounded by the write deadline
async fn write_frame<W: FrameSink>(sink: &mut W, frame: Frame, limit: Duration) -> Result<()> {
    match tokio::time::timeout(limit, sink.send_frame(frame)).await {
        Ok(result) => result,
        Err(_) => Err(HubError::WriteTimeout(limit)),
    }
}

/// Resolve once the close signal is raised
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            return;
        }
    }
}
