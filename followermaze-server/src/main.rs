//! Follower Maze Server
//!
//! Reads an unordered stream of sequence-numbered events from one event
//! source and delivers them, in order, to the user clients they concern.

mod config;
mod intake;
mod logging;
mod server;
mod shutdown;

use clap::Parser;
use config::{ConfigLoader, ListenOverrides};
use server::Server;
use shutdown::{spawn_config_reload_handler, spawn_shutdown_handler};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Follower Maze - ordered event fan-out server
#[derive(Parser, Debug)]
#[command(name = "followermaze-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file. Defaults apply without one.
    #[arg(short, long, env = "FOLLOWERMAZE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the event source listen address (e.g., 0.0.0.0:9090)
    #[arg(long, env = "FOLLOWERMAZE_EVENT_LISTEN")]
    event_listen: Option<SocketAddr>,

    /// Override the user client listen address (e.g., 0.0.0.0:9099)
    #[arg(long, env = "FOLLOWERMAZE_CLIENT_LISTEN")]
    client_listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(
        args.config.as_deref(),
        ListenOverrides {
            event_listen: args.event_listen,
            client_listen: args.client_listen,
        },
    ));
    let loaded_config = config_loader.load()?;

    // Initialize tracing
    let log_filter = logging::init_tracing(&loaded_config.logging)?;

    tracing::info!("Starting followermaze-server v{}", env!("CARGO_PKG_VERSION"));
    match config_loader.config_path() {
        Some(path) => tracing::info!("Configuration loaded from {:?}", path),
        None => tracing::info!("No configuration file given, using defaults"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_shutdown_handler(shutdown_tx)?;

    // Spawn config reload handler (listens for SIGHUP)
    spawn_config_reload_handler(config_loader, log_filter, shutdown_rx.clone())?;

    let server = Server::bind(loaded_config).await.map_err(|e| {
        tracing::error!("Failed to bind listeners: {}", e);
        e
    })?;
    tracing::info!(
        event_addr = %server.event_addr()?,
        client_addr = %server.client_addr()?,
        "Listening"
    );

    let result = server.run(shutdown_rx).await;
    tracing::info!("Server shutdown complete");
    result
}
