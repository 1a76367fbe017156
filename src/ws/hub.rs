/// Per-room hub - membership owner and broadcaster
///
/// Each hub runs a single control loop task that owns all membership
/// mutation. Two mailboxes feed it:
/// - an unbounded, ordered control queue (register / unregister)
/// - a bounded broadcast queue; producers wait when it is full
///
/// Fan-out offers each payload to every member concurrently and waits for
/// all offers to finish before the loop takes its next message, so
/// broadcasts from one hub are delivered to each member in FIFO order.
/// A member whose mailbox is full is evicted rather than waited on.
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::{
    errors::{HubError, Result},
    logger::{self, LogTag},
};

use super::{
    connection::{Connection, ConnectionId, SendOutcome},
    message::{Packet, Payload, EVENT_LOST_CONNECTION, EVENT_NEW_CONNECTION, EVENT_NUM_CONNECTIONS},
    metrics::HubMetrics,
    registry::HubRegistry,
};

// ============================================================================
// HUB TYPES
// ============================================================================

enum Control {
    Register(Arc<Connection>),
    Unregister(Arc<Connection>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Default)]
struct Lifecycle {
    /// Set once the hub has left the registry; no registration is accepted
    closed: bool,

    /// Registrations sent but not yet processed by the loop
    pending_registrations: usize,
}

/// Receiving ends of a hub's mailboxes, owned by its control loop
pub(crate) struct HubMailboxes {
    control: mpsc::UnboundedReceiver<Control>,
    broadcast: mpsc::Receiver<Payload>,
}

// ============================================================================
// HUB
// ============================================================================

pub struct Hub {
    id: String,

    /// Current members; written only by the control loop
    members: RwLock<HashMap<ConnectionId, Arc<Connection>>>,

    control_tx: mpsc::UnboundedSender<Control>,
    broadcast_tx: mpsc::Sender<Payload>,

    lifecycle: Mutex<Lifecycle>,

    registry: Weak<HubRegistry>,
    metrics: Arc<HubMetrics>,
}

impl Hub {
    pub(crate) fn new(
        id: &str,
        broadcast_capacity: usize,
        registry: Weak<HubRegistry>,
        metrics: Arc<HubMetrics>,
    ) -> (Arc<Self>, HubMailboxes) {
        let (control_tx, control) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast) = mpsc::channel(broadcast_capacity.max(1));

        let hub = Arc::new(Self {
            id: id.to_string(),
            members: RwLock::new(HashMap::new()),
            control_tx,
            broadcast_tx,
            lifecycle: Mutex::new(Lifecycle::default()),
            registry,
            metrics,
        });

        (hub, HubMailboxes { control, broadcast })
    }

    /// Start the control loop on the current tokio runtime
    pub(crate) fn spawn(self: &Arc<Self>, mailboxes: HubMailboxes) {
        tokio::spawn(Arc::clone(self).run(mailboxes));
    }

    /// Room identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connection_count(&self) -> usize {
        self.members.read().len()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.read().contains_key(&id)
    }

    /// True once the hub has been torn down
    pub fn is_closed(&self) -> bool {
        self.lifecycle.lock().closed
    }

    /// Ask the loop to add a connection
    ///
    /// Fails, handing the connection back, if the hub is already closed;
    /// the caller should look the room up again.
    pub fn register(&self, conn: Arc<Connection>) -> std::result::Result<(), Arc<Connection>> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.closed {
            return Err(conn);
        }
        if self
            .control_tx
            .send(Control::Register(Arc::clone(&conn)))
            .is_err()
        {
            // Loop is gone without tearing down; nothing will ever join
            lifecycle.closed = true;
            return Err(conn);
        }
        lifecycle.pending_registrations += 1;
        Ok(())
    }

    /// Ask the loop to remove and close a connection
    ///
    /// Never blocks. Unregistering a non-member is a no-op for membership
    /// but still closes the connection.
    pub fn unregister(&self, conn: Arc<Connection>) {
        if let Err(mpsc::error::SendError(Control::Unregister(conn))) =
            self.control_tx.send(Control::Unregister(conn))
        {
            conn.close();
        }
    }

    /// Queue a payload for every member, waiting while the mailbox is full
    pub async fn broadcast(&self, payload: Payload) -> Result<()> {
        self.broadcast_tx
            .send(payload)
            .await
            .map_err(|_| HubError::HubClosed(self.id.clone()))
    }

    // ========================================================================
    // CONTROL LOOP
    // ========================================================================

    async fn run(self: Arc<Self>, mut mailboxes: HubMailboxes) {
        logger::debug(LogTag::Hub, &format!("Hub {} loop started", self.id));

        loop {
            let flow = tokio::select! {
                control = mailboxes.control.recv() => match control {
                    Some(Control::Register(conn)) => self.connect(conn),
                    Some(Control::Unregister(conn)) => self.disconnect(conn),
                    None => Flow::Stop,
                },
                payload = mailboxes.broadcast.recv() => match payload {
                    Some(payload) => {
                        self.fan_out(payload).await;
                        Flow::Continue
                    }
                    None => Flow::Stop,
                },
            };

            if flow == Flow::Stop {
                break;
            }
        }

        logger::debug(LogTag::Hub, &format!("Hub {} loop stopped", self.id));
    }

    fn connect(self: &Arc<Self>, conn: Arc<Connection>) -> Flow {
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.pending_registrations = lifecycle.pending_registrations.saturating_sub(1);
        }

        // Unregistered before its registration was processed
        if conn.is_dead() {
            logger::debug(
                LogTag::Hub,
                &format!("Hub {} skipped registration of closed {}", self.id, conn.id()),
            );
            if self.members.read().is_empty() {
                return self.try_teardown();
            }
            return Flow::Continue;
        }

        let count = {
            let mut members = self.members.write();
            members.insert(conn.id(), Arc::clone(&conn));
            members.len()
        };

        logger::debug(
            LogTag::Hub,
            &format!("{} joined hub {} ({} members)", conn.id(), self.id, count),
        );
        self.announce(EVENT_NEW_CONNECTION, count);
        Flow::Continue
    }

    fn disconnect(self: &Arc<Self>, conn: Arc<Connection>) -> Flow {
        let (removed, count) = {
            let mut members = self.members.write();
            let removed = members.remove(&conn.id()).is_some();
            (removed, members.len())
        };
        conn.close();

        if !removed {
            return Flow::Continue;
        }

        logger::debug(
            LogTag::Hub,
            &format!("{} left hub {} ({} members)", conn.id(), self.id, count),
        );
        if count == 0 {
            return self.try_teardown();
        }
        self.announce(EVENT_LOST_CONNECTION, count);
        Flow::Continue
    }

    /// Close the hub if nothing is pending, leaving the registry with it
    fn try_teardown(self: &Arc<Self>) -> Flow {
        let torn_down = match self.registry.upgrade() {
            Some(registry) => registry.remove_if_idle(self),
            None => self.close_if_idle(),
        };

        if torn_down {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    /// Mark the hub closed if it has no members and no pending registrations
    ///
    /// Called by the registry under its write lock so that closing and
    /// leaving the registry happen together.
    pub(crate) fn close_if_idle(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.closed {
            return true;
        }
        if lifecycle.pending_registrations > 0 || !self.members.read().is_empty() {
            return false;
        }
        lifecycle.closed = true;
        true
    }

    // ========================================================================
    // FAN-OUT
    // ========================================================================

    async fn fan_out(self: &Arc<Self>, payload: Payload) {
        let mut sends = JoinSet::new();
        {
            let members = self.members.read();
            for conn in members.values() {
                let conn = Arc::clone(conn);
                let hub = Arc::clone(self);
                let payload = payload.clone();
                sends.spawn(async move { conn.send(payload, &hub) });
            }
        }

        let issued = sends.len();
        let mut queued = 0;
        let mut evicted = 0;
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok(SendOutcome::Queued) => queued += 1,
                Ok(SendOutcome::Evicted) => evicted += 1,
                Ok(SendOutcome::Dead) => {}
                Err(e) => logger::error(
                    LogTag::Hub,
                    &format!("Hub {} send task failed: {}", self.id, e),
                ),
            }
        }

        self.metrics.fan_out_completed(queued, evicted);
        logger::verbose(
            LogTag::Hub,
            &format!(
                "Hub {} fan-out of {} bytes: {} issued, {} queued, {} evicted",
                self.id,
                payload.len(),
                issued,
                queued,
                evicted
            ),
        );
    }

    // ========================================================================
    // NOTIFICATIONS
    // ========================================================================

    /// Broadcast a membership line and the member count without blocking
    /// the loop
    fn announce(&self, event: &str, count: usize) {
        let line = format!("{} clients currently connected to hub {}", count, self.id);
        let encoded = [
            Packet::new(event, line).to_payload(),
            Packet::new(EVENT_NUM_CONNECTIONS, count).to_payload(),
        ];

        let mut packets = Vec::with_capacity(encoded.len());
        for packet in encoded {
            match packet {
                Ok(payload) => packets.push(payload),
                Err(e) => {
                    self.metrics.notification_dropped();
                    logger::warning(
                        LogTag::Hub,
                        &format!("Hub {} could not encode {}: {}", self.id, event, e),
                    );
                }
            }
        }

        let broadcast_tx = self.broadcast_tx.clone();
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            for payload in packets {
                // Hub may have been torn down meanwhile
                if broadcast_tx.send(payload).await.is_err() {
                    metrics.notification_dropped();
                }
            }
        });
    }
}
