/// Shared application state for the webserver
///
/// Holds the hub registry every route works against.
use std::sync::Arc;

use crate::ws::HubRegistry;

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// Room registry
    pub registry: Arc<HubRegistry>,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(registry: Arc<HubRegistry>) -> Self {
        Self {
            registry,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
