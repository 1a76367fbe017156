/// Multi-room WebSocket Hub Module
///
/// Clients attach to a named room and every text or binary message one of
/// them sends is relayed to every member of that room.
///
/// ## Architecture
/// - One `Hub` per room, created on first join and torn down when the last
///   member leaves
/// - A single control loop per hub owns membership; broadcasts are fanned
///   out concurrently and each fan-out completes before the next starts
/// - Bounded per-connection outbound queues; a full queue evicts the
///   connection instead of slowing the room down
/// - Ping/pong keepalive with a read deadline refreshed only by pongs
///
/// ## Key Components
/// - `registry`: Room id to hub map, attach entry point, cross-room sends
/// - `hub`: Per-room control loop, fan-out and membership notifications
/// - `connection`: Liveness, eviction and the read/write loops
/// - `message`: Opaque payloads and the `{"Event","Data"}` packet envelope
/// - `transport`: Frame-level socket boundary with tungstenite/axum adapters
/// - `health`: Read deadline and ping ticker
/// - `metrics`: Process-wide counters for monitoring
pub mod connection;
pub mod health;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod registry;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection::{Connection, ConnectionId, SendOutcome};
pub use hub::Hub;
pub use message::{packetize, Packet, Payload};
pub use metrics::{HubMetrics, HubMetricsSnapshot};
pub use registry::HubRegistry;
pub use transport::{websocket_config, Frame, FrameSink, FrameSource, Transport};
