/// Hub registry - room id to live hub
///
/// Hubs are created lazily on first lookup and removed by their own control
/// loop once their last member leaves. Removal is identity-checked: a stale
/// hub never removes a newer hub registered under the same room id.
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    config::HubConfig,
    errors::Result,
    logger::{self, LogTag},
};

use super::{
    connection::Connection,
    hub::Hub,
    message::Payload,
    metrics::HubMetrics,
    transport::Transport,
};

pub struct HubRegistry {
    hubs: RwLock<HashMap<String, Arc<Hub>>>,
    config: Arc<HubConfig>,
    metrics: Arc<HubMetrics>,
}

impl HubRegistry {
    pub fn new(config: HubConfig) -> Arc<Self> {
        Arc::new(Self {
            hubs: RwLock::new(HashMap::new()),
            config: Arc::new(config),
            metrics: HubMetrics::new(),
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Look up a live hub without creating one
    pub fn get(&self, room_id: &str) -> Option<Arc<Hub>> {
        self.hubs.read().get(room_id).cloned()
    }

    /// Return the hub for `room_id`, creating and starting it if absent
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_or_create(self: &Arc<Self>, room_id: &str) -> Arc<Hub> {
        if let Some(hub) = self.hubs.read().get(room_id) {
            return Arc::clone(hub);
        }

        let mut hubs = self.hubs.write();
        if let Some(hub) = hubs.get(room_id) {
            return Arc::clone(hub);
        }

        let (hub, mailboxes) = Hub::new(
            room_id,
            self.config.broadcast_queue_size,
            Arc::downgrade(self),
            Arc::clone(&self.metrics),
        );
        hub.spawn(mailboxes);
        hubs.insert(room_id.to_string(), Arc::clone(&hub));
        self.metrics.hub_created();

        logger::info(
            LogTag::Registry,
            &format!("Hub created for room {} ({} hubs live)", room_id, hubs.len()),
        );
        hub
    }

    /// Close `hub` and drop it from the registry if it is idle
    ///
    /// Returns true if the hub is closed afterwards. The map entry is only
    /// removed when it still points at this exact hub.
    pub(crate) fn remove_if_idle(&self, hub: &Arc<Hub>) -> bool {
        let mut hubs = self.hubs.write();
        if !hub.close_if_idle() {
            return false;
        }

        let current = hubs
            .get(hub.id())
            .map_or(false, |registered| Arc::ptr_eq(registered, hub));
        if current {
            hubs.remove(hub.id());
            self.metrics.hub_torn_down();
            logger::info(
                LogTag::Registry,
                &format!("Hub for room {} torn down ({} hubs live)", hub.id(), hubs.len()),
            );
        }
        true
    }

    /// Number of live hubs
    pub fn hub_count(&self) -> usize {
        self.hubs.read().len()
    }

    /// Live room ids, sorted
    pub fn room_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.hubs.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Members across every live hub
    pub fn connection_count(&self) -> usize {
        self.hubs
            .read()
            .values()
            .map(|hub| hub.connection_count())
            .sum()
    }

    fn snapshot_hubs(&self) -> Vec<Arc<Hub>> {
        self.hubs.read().values().cloned().collect()
    }

    /// Queue a payload on every live hub; returns how many accepted it
    ///
    /// Hubs are visited in turn, each send waiting while that hub's mailbox
    /// is full. Hubs torn down in the meantime are skipped.
    pub async fn broadcast_all(&self, payload: Payload) -> usize {
        let mut delivered = 0;
        for hub in self.snapshot_hubs() {
            if hub.broadcast(payload.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        logger::debug(
            LogTag::Registry,
            &format!("Broadcast to all rooms reached {} hubs", delivered),
        );
        delivered
    }

    /// Queue a payload on each named room that has a live hub
    ///
    /// Unknown room ids are skipped; no hub is created.
    pub async fn multicast<S: AsRef<str>>(&self, payload: Payload, room_ids: &[S]) -> usize {
        let hubs: Vec<Arc<Hub>> = {
            let registered = self.hubs.read();
            room_ids
                .iter()
                .filter_map(|id| registered.get(id.as_ref()).cloned())
                .collect()
        };

        let mut delivered = 0;
        for hub in hubs {
            if hub.broadcast(payload.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        logger::debug(
            LogTag::Registry,
            &format!(
                "Multicast to {} rooms reached {} hubs",
                room_ids.len(),
                delivered
            ),
        );
        delivered
    }

    // ========================================================================
    // ATTACH
    // ========================================================================

    /// Register `conn` with the hub for `room_id`, retrying if the hub found
    /// was closing
    ///
    /// A refusing hub is closed for good, so it is dropped from the registry
    /// before the next lookup. Each retry therefore reaches a newer hub.
    fn join(self: &Arc<Self>, conn: &Arc<Connection>, room_id: &str) -> Arc<Hub> {
        loop {
            let hub = self.get_or_create(room_id);
            if hub.register(Arc::clone(conn)).is_ok() {
                return hub;
            }
            logger::debug(
                LogTag::Registry,
                &format!("Hub for room {} was closing, looking it up again", room_id),
            );
            self.discard(&hub);
        }
    }

    /// Drop a closed hub's map entry if it is still the registered one
    fn discard(&self, hub: &Arc<Hub>) {
        let mut hubs = self.hubs.write();
        let current = hubs
            .get(hub.id())
            .map_or(false, |registered| Arc::ptr_eq(registered, hub));
        if current && hub.is_closed() {
            hubs.remove(hub.id());
            self.metrics.hub_torn_down();
            logger::warning(
                LogTag::Registry,
                &format!("Dropped closed hub for room {} from the registry", hub.id()),
            );
        }
    }

    /// Serve an upgraded socket as a member of `room_id`
    ///
    /// Spawns the writer task and runs the reader on the calling task.
    /// Returns when the connection ends: Ok for a clean close, Err with the
    /// reason otherwise. The connection is unregistered either way.
    pub async fn attach<T: Transport>(self: &Arc<Self>, transport: T, room_id: &str) -> Result<()> {
        let (sink, source) = transport.split();
        let (conn, outbound) = Connection::new(self.config.outbound_queue_size);
        let hub = self.join(&conn, room_id);
        self.metrics.connection_opened();

        logger::debug(
            LogTag::Connection,
            &format!("{} attached to room {}", conn.id(), room_id),
        );

        {
            let conn = Arc::clone(&conn);
            let hub = Arc::clone(&hub);
            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                if let Err(e) = conn.write_loop(sink, outbound, &config).await {
                    logger::debug(
                        LogTag::Connection,
                        &format!("{} writer stopped: {}", conn.id(), e),
                    );
                }
                hub.unregister(conn);
            });
        }

        let result = conn.read_loop(source, &hub, &self.config).await;
        match &result {
            Ok(()) => logger::debug(
                LogTag::Connection,
                &format!("{} closed in room {}", conn.id(), room_id),
            ),
            Err(e) => logger::debug(
                LogTag::Connection,
                &format!("{} dropped from room {}: {}", conn.id(), room_id, e),
            ),
        }

        hub.unregister(Arc::clone(&conn));
        self.metrics.connection_closed();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HubError;
    use crate::ws::test_support::{
        next_chat, next_close, recv_chat, spawn_attach, test_config, wait_until,
    };
    use crate::ws::transport::websocket_config;
    use futures::SinkExt;
    use std::time::{Duration, Instant};
    use tokio::io::AsyncWriteExt;
    use tokio_tungstenite::tungstenite::protocol::Role;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::WebSocketStream;

    fn room_size(registry: &HubRegistry, room: &str) -> usize {
        registry.get(room).map_or(0, |hub| hub.connection_count())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_or_create_yields_one_hub() {
        let registry = HubRegistry::new(test_config());
        let mut lookups = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            lookups.push(tokio::spawn(async move { registry.get_or_create("shared") }));
        }

        let mut hubs = Vec::new();
        for lookup in lookups {
            hubs.push(lookup.await.unwrap());
        }
        assert!(hubs.iter().all(|hub| Arc::ptr_eq(hub, &hubs[0])));
        assert_eq!(registry.hub_count(), 1);
        assert_eq!(registry.metrics().snapshot().hubs_created, 1);
    }

    #[tokio::test]
    async fn test_stale_hub_does_not_remove_successor() {
        let registry = HubRegistry::new(test_config());
        let first = registry.get_or_create("room");
        let (conn, _outbound) = Connection::new(64);
        first.register(Arc::clone(&conn)).unwrap();
        first.unregister(conn);
        assert!(wait_until(|| registry.get("room").is_none(), Duration::from_secs(2)).await);

        let second = registry.get_or_create("room");
        assert!(!Arc::ptr_eq(&first, &second));

        // A late teardown from the old hub leaves the new one alone
        assert!(registry.remove_if_idle(&first));
        let current = registry.get("room").expect("successor stays registered");
        assert!(Arc::ptr_eq(&current, &second));
        assert_eq!(registry.metrics().snapshot().hubs_torn_down, 1);
    }

    #[tokio::test]
    async fn test_broadcast_all_and_multicast() {
        let registry = HubRegistry::new(test_config());
        let mut outbound = HashMap::new();
        for room in ["a", "b", "c"] {
            let (conn, rx) = Connection::new(64);
            registry.get_or_create(room).register(conn).unwrap();
            outbound.insert(room, rx);
        }
        assert!(wait_until(|| registry.connection_count() == 3, Duration::from_secs(2)).await);
        assert_eq!(registry.room_ids(), vec!["a", "b", "c"]);

        assert_eq!(registry.broadcast_all(Payload::from("everyone")).await, 3);
        for rx in outbound.values_mut() {
            assert_eq!(recv_chat(rx).await.as_deref(), Some("everyone"));
        }

        let sent = registry
            .multicast(Payload::from("some"), &["a", "missing", "c"])
            .await;
        assert_eq!(sent, 2);
        assert!(registry.get("missing").is_none());

        for room in ["a", "c"] {
            let rx = outbound.get_mut(room).unwrap();
            assert_eq!(recv_chat(rx).await.as_deref(), Some("some"));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        let rx_b = outbound.get_mut("b").unwrap();
        while let Ok(payload) = rx_b.try_recv() {
            assert_ne!(payload, Payload::from("some"));
        }
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let registry = HubRegistry::new(test_config());
        let (_a1, mut sender) = spawn_attach(&registry, "A", 64 * 1024).await;
        let (_a2, mut peer) = spawn_attach(&registry, "A", 64 * 1024).await;
        let (_b1, mut outsider) = spawn_attach(&registry, "B", 64 * 1024).await;
        assert!(wait_until(|| room_size(&registry, "A") == 2, Duration::from_secs(2)).await);
        assert!(wait_until(|| room_size(&registry, "B") == 1, Duration::from_secs(2)).await);

        sender.send(Message::Text("hello".to_string())).await.unwrap();

        assert_eq!(next_chat(&mut peer).await.as_deref(), Some("hello"));
        assert_eq!(next_chat(&mut sender).await.as_deref(), Some("hello"));
        assert!(
            tokio::time::timeout(Duration::from_millis(200), next_chat(&mut outsider))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_binary_payloads_are_relayed() {
        let registry = HubRegistry::new(test_config());
        let (_a, mut sender) = spawn_attach(&registry, "bin", 64 * 1024).await;
        let (_b, mut peer) = spawn_attach(&registry, "bin", 64 * 1024).await;
        assert!(wait_until(|| room_size(&registry, "bin") == 2, Duration::from_secs(2)).await);

        sender.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), async {
            use futures::StreamExt;
            while let Some(Ok(message)) = peer.next().await {
                if let Message::Binary(data) = message {
                    return Some(data);
                }
            }
            None
        })
        .await
        .unwrap();
        assert_eq!(received, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_wedged_client_does_not_stall_room() {
        let config = HubConfig {
            outbound_queue_size: 16,
            write_timeout_ms: 1_000,
            ..test_config()
        };
        let registry = HubRegistry::new(config);
        let (_s, mut sender) = spawn_attach(&registry, "busy", 64 * 1024).await;
        let (_h, mut healthy) = spawn_attach(&registry, "busy", 64 * 1024).await;
        // Never read from; its socket buffer fills after a few frames
        let (_w, _wedged) = spawn_attach(&registry, "busy", 64).await;
        assert!(wait_until(|| room_size(&registry, "busy") == 3, Duration::from_secs(2)).await);

        let started = Instant::now();
        for i in 0..40 {
            sender.send(Message::Text(format!("msg-{}", i))).await.unwrap();
        }
        for i in 0..40 {
            assert_eq!(next_chat(&mut healthy).await, Some(format!("msg-{}", i)));
        }
        assert!(started.elapsed() < Duration::from_secs(2));

        assert!(wait_until(|| room_size(&registry, "busy") == 2, Duration::from_secs(2)).await);
        assert!(registry.metrics().snapshot().evictions >= 1);
    }

    #[tokio::test]
    async fn test_last_leave_tears_down_and_rejoin_creates_new_hub() {
        let registry = HubRegistry::new(test_config());
        let (attached, client) = spawn_attach(&registry, "ephemeral", 64 * 1024).await;
        assert!(wait_until(|| room_size(&registry, "ephemeral") == 1, Duration::from_secs(2)).await);
        let first = registry.get("ephemeral").unwrap();

        drop(client);
        let _ = tokio::time::timeout(Duration::from_secs(2), attached)
            .await
            .expect("attach returns after peer leaves");
        assert!(wait_until(|| registry.get("ephemeral").is_none(), Duration::from_secs(2)).await);
        assert!(first.is_closed());

        let (_again, _client) = spawn_attach(&registry, "ephemeral", 64 * 1024).await;
        assert!(wait_until(|| room_size(&registry, "ephemeral") == 1, Duration::from_secs(2)).await);
        let second = registry.get("ephemeral").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(registry.metrics().snapshot().hubs_created, 2);
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        let config = HubConfig {
            read_timeout_ms: 200,
            ping_interval_ms: 100,
            ..test_config()
        };
        let registry = HubRegistry::new(config);
        let started = Instant::now();
        let (attached, mut client) = spawn_attach(&registry, "quiet", 64 * 1024).await;

        let result = tokio::time::timeout(Duration::from_secs(2), attached)
            .await
            .expect("reader gives up")
            .unwrap();
        assert!(matches!(result, Err(HubError::ReadTimeout(_))));
        assert!(started.elapsed() < Duration::from_millis(1000));

        assert!(next_close(&mut client).await);
        assert!(wait_until(|| registry.get("quiet").is_none(), Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_ponging_client_stays_attached() {
        let config = HubConfig {
            read_timeout_ms: 200,
            ping_interval_ms: 100,
            ..test_config()
        };
        let registry = HubRegistry::new(config);
        let (attached, client) = spawn_attach(&registry, "lively", 64 * 1024).await;

        let responder = tokio::spawn(async move {
            use futures::StreamExt;
            let (mut write, mut read) = StreamExt::split(client);
            while let Some(Ok(message)) = read.next().await {
                if let Message::Ping(data) = message {
                    if write.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!attached.is_finished());
        assert_eq!(room_size(&registry, "lively"), 1);
        responder.abort();
    }

    #[tokio::test]
    async fn test_oversized_frame_drops_connection() {
        let registry = HubRegistry::new(test_config());
        let (attached, mut client) = spawn_attach(&registry, "limits", 64 * 1024).await;
        assert!(wait_until(|| room_size(&registry, "limits") == 1, Duration::from_secs(2)).await);

        let limit = registry.config().max_message_size;
        client
            .send(Message::Text("x".repeat(limit + 1)))
            .await
            .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), attached)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            result,
            Err(HubError::MessageTooLarge { size, .. }) if size == limit + 1
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected_from_header() {
        let registry = HubRegistry::new(HubConfig {
            max_message_size: 4096,
            ..test_config()
        });
        let (server_io, mut client_io) = tokio::io::duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(
            server_io,
            Role::Server,
            Some(websocket_config(registry.config())),
        )
        .await;
        let attached = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.attach(server, "limits").await })
        };

        // Masked binary frame announcing 8 MiB; the payload never follows
        let announced = 8 * 1024 * 1024;
        let mut header = vec![0x82, 0x80 | 127];
        header.extend_from_slice(&(announced as u64).to_be_bytes());
        header.extend_from_slice(&[1, 2, 3, 4]);
        client_io.write_all(&header).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), attached)
            .await
            .expect("rejected without waiting for the payload")
            .unwrap();
        assert!(matches!(
            result,
            Err(HubError::MessageTooLarge { size, limit: 4096 }) if size == announced
        ));
    }

    #[tokio::test]
    async fn test_attach_moves_past_closed_hub() {
        let registry = HubRegistry::new(test_config());
        let closing = registry.get_or_create("handover");
        // Closed but still in the map
        assert!(closing.close_if_idle());

        let (_attached, mut client) = spawn_attach(&registry, "handover", 64 * 1024).await;
        assert!(wait_until(|| room_size(&registry, "handover") == 1, Duration::from_secs(2)).await);
        let current = registry.get("handover").unwrap();
        assert!(!Arc::ptr_eq(&current, &closing));
        assert_eq!(registry.metrics().snapshot().hubs_created, 2);

        client
            .send(Message::Text("after handover".to_string()))
            .await
            .unwrap();
        assert_eq!(next_chat(&mut client).await.as_deref(), Some("after handover"));
    }

    #[tokio::test]
    async fn test_attach_replaces_hub_whose_loop_is_gone() {
        let registry = HubRegistry::new(test_config());
        let (orphan, mailboxes) =
            Hub::new("orphaned", 4, Arc::downgrade(&registry), registry.metrics());
        drop(mailboxes);
        registry
            .hubs
            .write()
            .insert("orphaned".to_string(), Arc::clone(&orphan));

        let (_attached, _client) = spawn_attach(&registry, "orphaned", 64 * 1024).await;
        assert!(wait_until(|| room_size(&registry, "orphaned") == 1, Duration::from_secs(2)).await);
        let current = registry.get("orphaned").unwrap();
        assert!(!Arc::ptr_eq(&current, &orphan));
        assert!(orphan.is_closed());
    }
}
