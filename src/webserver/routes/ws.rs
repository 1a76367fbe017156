/// WebSocket upgrade endpoint
///
/// `GET /ws/:room` upgrades the request and attaches the socket to the
/// room's hub for the lifetime of the connection.
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
    webserver::{
        state::AppState,
        utils::{error_response, is_valid_room_id},
    },
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws/:room", get(ws_handler))
}

/// GET /ws/:room
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if !is_valid_room_id(&room) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_ROOM",
            "Room ids may only contain letters, digits, spaces and _!.,+-",
            Some(&room),
        );
    }

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!("WebSocket upgrade requested for room {}", room),
        );
    }

    // Oversized frames are refused from their header, before buffering
    let limit = state.registry.config().max_message_size;
    let registry = Arc::clone(&state.registry);
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| async move {
            if let Err(e) = registry.attach(socket, &room).await {
                logger::debug(
                    LogTag::Webserver,
                    &format!("Client left room {}: {}", room, e),
                );
            }
        })
}
