/// Axum webserver implementation
///
/// Main server lifecycle management including startup, shutdown, and graceful termination
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::{
    config::ServerConfig,
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
    ws::HubRegistry,
};

/// Global shutdown notifier
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

/// Start the webserver
///
/// This function blocks until the server is shut down
pub async fn start_server(config: &ServerConfig, registry: Arc<HubRegistry>) -> Result<(), String> {
    let bind_address = config.bind_address();
    logger::debug(
        LogTag::Webserver,
        &format!("Starting webserver on {}", bind_address),
    );

    let state = Arc::new(AppState::new(registry));
    let app = build_app(state);

    // Parse bind address
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|e| format!("Invalid bind address {}: {}", bind_address, e))?;

    // Create TCP listener
    let listener = TcpListener::bind(&addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => format!(
            "Failed to bind to {}: Address already in use\n\
             \n\
             Another wshub instance (or another service) is using port {}.\n\
             Pick a different port with --port or [server].port in the config file.",
            addr, config.port
        ),
        std::io::ErrorKind::PermissionDenied => format!(
            "Failed to bind to {}: Permission denied\n\
             \n\
             Port {} requires elevated privileges on this system.\n\
             Consider using a port above 1024 or running with appropriate permissions.",
            addr, config.port
        ),
        _ => format!("Failed to bind to {}: {}", addr, e),
    })?;

    logger::info(
        LogTag::Webserver,
        &format!("Listening on http://{} (websockets at /ws/<room>)", addr),
    );

    // Run the server with graceful shutdown
    let shutdown_signal = async {
        SHUTDOWN_NOTIFY.notified().await;
        logger::debug(
            LogTag::Webserver,
            "Received shutdown signal, stopping webserver...",
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    logger::info(LogTag::Webserver, "Webserver stopped gracefully");

    Ok(())
}

/// Trigger webserver shutdown
pub fn shutdown() {
    logger::debug(LogTag::Webserver, "Triggering webserver shutdown...");
    SHUTDOWN_NOTIFY.notify_one();
}

/// Build the Axum application with all routes
fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state)
}
