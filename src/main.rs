use anyhow::{anyhow, Result};
use clap::Parser;
use wshub::{
    arguments::print_debug_info,
    config::{self, CONFIG_FILE_PATH},
    logger::{self, LogTag},
    webserver,
    ws::HubRegistry,
};

// Debug flags are declared for --help; the logger reads them from the raw args
#[allow(dead_code)]
#[derive(Parser)]
#[command(name = "wshub")]
#[command(about = "Multi-room websocket chat hub", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = CONFIG_FILE_PATH)]
    config: String,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Debug output for the hub registry
    #[arg(long)]
    debug_registry: bool,

    /// Debug output for per-room hub loops
    #[arg(long)]
    debug_hub: bool,

    /// Debug output for connection read/write loops
    #[arg(long)]
    debug_connection: bool,

    /// Debug output for ping/pong keepalive
    #[arg(long)]
    debug_keepalive: bool,

    /// Debug output for the webserver
    #[arg(long)]
    debug_webserver: bool,

    /// Verbose output for every module
    #[arg(long)]
    verbose: bool,

    /// Only print errors
    #[arg(long)]
    quiet: bool,
}

/// Demo server: websocket rooms at /ws/<room> plus a small admin API
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init();
    print_debug_info();

    let mut config = config::load_config_from_path(&args.config).map_err(|e| anyhow!(e))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate().map_err(|e| anyhow!(e))?;

    logger::info(
        LogTag::System,
        &format!(
            "wshub {} starting (read timeout {}ms, ping {}ms, max message {} bytes)",
            env!("CARGO_PKG_VERSION"),
            config.hub.read_timeout_ms,
            config.hub.ping_interval_ms,
            config.hub.max_message_size
        ),
    );

    let registry = HubRegistry::new(config.hub.clone());

    tokio::spawn(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                logger::info(LogTag::System, "Ctrl-C received, shutting down");
                webserver::shutdown();
            }
            Err(e) => logger::error(
                LogTag::System,
                &format!("Failed to listen for Ctrl-C: {}", e),
            ),
        }
    });

    webserver::start_server(&config.server, registry)
        .await
        .map_err(|e| anyhow!(e))?;

    logger::info(LogTag::System, "wshub stopped");
    Ok(())
}
