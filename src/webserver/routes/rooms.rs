use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{
        state::AppState,
        utils::{error_response, parse_room_list, success_response},
    },
    ws::Payload,
};

/// Block repeated to build the injector's filler message
const FILLER_BLOCK: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Number of filler blocks in one injected message
const FILLER_REPEAT: usize = 21;

// =============================================================================
// REQUEST / RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MulticastQuery {
    /// Comma-separated room ids
    pub rooms: String,
}

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    /// Hubs that accepted the message
    pub rooms_reached: usize,
    pub bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct InjectResponse {
    pub queued: bool,
    pub bytes: usize,
}

// =============================================================================
// ROUTE HANDLERS
// =============================================================================

/// POST /api/broadcast - relay the request body to every room
async fn broadcast(State(state): State<Arc<AppState>>, body: String) -> Response {
    if body.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "EMPTY_BODY",
            "Nothing to broadcast",
            None,
        );
    }

    let bytes = body.len();
    let rooms_reached = state.registry.broadcast_all(Payload::text(body)).await;
    logger::info(
        LogTag::Webserver,
        &format!("Broadcast of {} bytes reached {} rooms", bytes, rooms_reached),
    );

    success_response(DeliveryResponse {
        rooms_reached,
        bytes,
    })
}

/// POST /api/multicast?rooms=a,b - relay the request body to the named rooms
async fn multicast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MulticastQuery>,
    body: String,
) -> Response {
    let rooms = parse_room_list(&query.rooms);
    if rooms.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "NO_ROOMS",
            "At least one room id is required",
            Some("Use ?rooms=a,b"),
        );
    }

    let bytes = body.len();
    let rooms_reached = state
        .registry
        .multicast(Payload::text(body), rooms.as_slice())
        .await;

    success_response(DeliveryResponse {
        rooms_reached,
        bytes,
    })
}

/// POST /api/inject - broadcast a filler message to every room in the
/// background (load testing)
async fn inject(State(state): State<Arc<AppState>>) -> Response {
    let filler = filler_message();
    let bytes = filler.len();
    let registry = Arc::clone(&state.registry);

    tokio::spawn(async move {
        let reached = registry.broadcast_all(Payload::text(filler)).await;
        logger::debug(
            LogTag::Webserver,
            &format!("Injected filler message into {} rooms", reached),
        );
    });

    success_response(InjectResponse {
        queued: true,
        bytes,
    })
}

fn filler_message() -> String {
    FILLER_BLOCK.repeat(FILLER_REPEAT)
}

// =============================================================================
// ROUTER
// =============================================================================

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/broadcast", post(broadcast))
        .route("/multicast", post(multicast))
        .route("/inject", post(inject))
}
