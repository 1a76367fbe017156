use axum::{extract::State, response::Response, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{state::AppState, utils::success_response},
    ws::HubMetricsSnapshot,
};

/// Simple health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomStats {
    pub id: String,
    pub connections: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hubs: usize,
    pub connections: usize,
    pub rooms: Vec<RoomStats>,
    pub metrics: HubMetricsSnapshot,
}

/// Create status routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(stats))
}

/// GET /api/health
async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    logger::debug(LogTag::Webserver, "Health check endpoint called");

    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    success_response(response)
}

/// GET /api/stats
async fn stats(State(state): State<Arc<AppState>>) -> Response {
    let registry = &state.registry;
    let rooms: Vec<RoomStats> = registry
        .room_ids()
        .into_iter()
        .map(|id| {
            let connections = registry.get(&id).map_or(0, |hub| hub.connection_count());
            RoomStats { id, connections }
        })
        .collect();

    let response = StatsResponse {
        hubs: rooms.len(),
        connections: rooms.iter().map(|room| room.connections).sum(),
        rooms,
        metrics: registry.metrics().snapshot(),
    };

    success_response(response)
}
