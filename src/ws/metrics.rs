use serde::Serialize;
/// Hub metrics collection
///
/// Process-wide counters shared by the registry, every hub and every
/// connection. Cheap atomics; read them through `snapshot()`.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Aggregate counters across all rooms
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Connections attached (lifetime)
    total_connections: AtomicU64,

    /// Connections currently attached
    active_connections: AtomicUsize,

    /// Hubs created (lifetime)
    hubs_created: AtomicU64,

    /// Hubs torn down after their last member left
    hubs_torn_down: AtomicU64,

    /// Payloads fanned out by hub loops
    messages_broadcast: AtomicU64,

    /// Payloads placed on a connection's outbound queue
    deliveries_queued: AtomicU64,

    /// Connections evicted for a full or closed outbound queue
    evictions: AtomicU64,

    /// Membership notifications that could not be encoded or enqueued
    notifications_dropped: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record new connection
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record connection closed
    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn hub_created(&self) {
        self.hubs_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hub_torn_down(&self) {
        self.hubs_torn_down.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed fan-out
    pub fn fan_out_completed(&self, queued: u64, evicted: u64) {
        self.messages_broadcast.fetch_add(1, Ordering::Relaxed);
        self.deliveries_queued.fetch_add(queued, Ordering::Relaxed);
        self.evictions.fetch_add(evicted, Ordering::Relaxed);
    }

    pub fn notification_dropped(&self) {
        self.notifications_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            hubs_created: self.hubs_created.load(Ordering::Relaxed),
            hubs_torn_down: self.hubs_torn_down.load(Ordering::Relaxed),
            messages_broadcast: self.messages_broadcast.load(Ordering::Relaxed),
            deliveries_queued: self.deliveries_queued.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            notifications_dropped: self.notifications_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Hub metrics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct HubMetricsSnapshot {
    pub total_connections: u64,
    pub active_connections: usize,
    pub hubs_created: u64,
    pub hubs_torn_down: u64,
    pub messages_broadcast: u64,
    pub deliveries_queued: u64,
    pub evictions: u64,
    pub notifications_dropped: u64,
}
