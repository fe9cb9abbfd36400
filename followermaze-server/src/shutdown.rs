//! Signal handling for graceful shutdown and config reload.

use crate::config::ConfigLoader;
use crate::logging::{LogFilterHandle, build_filter};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Resolves once shutdown has been requested, or the shutdown sender is
/// gone.
pub async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

/// Installs SIGTERM and SIGINT (Ctrl+C) handlers that flip `shutdown_tx`.
pub fn spawn_shutdown_handler(shutdown_tx: watch::Sender<bool>) -> std::io::Result<JoinHandle<()>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
        shutdown_tx.send_replace(true);
    }))
}

/// Spawns a task that listens for SIGHUP and reloads the configuration.
///
/// Listen addresses and sequencer settings are fixed for the life of the
/// process; only the logging filter is applied.
pub fn spawn_config_reload_handler(
    config_loader: Arc<ConfigLoader>,
    log_filter: LogFilterHandle,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<JoinHandle<()>> {
    let mut sighup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading configuration");
                    match config_loader.reload() {
                        Ok(loaded_config) => {
                            match log_filter.reload(build_filter(&loaded_config.logging.filter)) {
                                Ok(()) => tracing::info!(
                                    filter = %loaded_config.logging.filter,
                                    "Logging filter reloaded"
                                ),
                                Err(e) => tracing::error!("Failed to reload logging filter: {}", e),
                            }
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
                _ = shutdown_requested(&mut shutdown_rx) => {
                    tracing::debug!("Config reload handler shutting down");
                    break;
                }
            }
        }
    }))
}
