//! Client intake.
//!
//! A user client identifies itself with a single line holding its user id.
//! The write half of its socket then becomes the connection's transport.
//! The read half is drained for as long as the client stays connected, so
//! that a disconnect unregisters the client even when nothing was ever
//! sent to it.

use crate::shutdown::shutdown_requested;
use followermaze_core::events::UserId;
use followermaze_core::notify::SocketTransport;
use followermaze_core::registry::ClientRegistry;
use followermaze_sdk::strip_terminator;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Why a client's id line was rejected.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("connection closed before an id was sent")]
    Disconnected,

    #[error("id line longer than {limit} bytes")]
    TooLong { limit: usize },

    #[error("invalid user id {0:?}")]
    InvalidId(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read and parse the id line, reading at most `limit` bytes plus a
/// terminator.
pub async fn read_user_id<R>(reader: &mut R, limit: usize) -> Result<UserId, RegistrationError>
where
    R: AsyncBufRead + Unpin,
{
    let max_line = limit.saturating_add(2);
    let mut line = Vec::new();
    let mut limited = reader.take(max_line as u64);
    let read = limited.read_until(b'\n', &mut line).await?;

    if read == 0 {
        return Err(RegistrationError::Disconnected);
    }
    if !line.ends_with(b"\n") && line.len() >= max_line {
        return Err(RegistrationError::TooLong { limit });
    }

    let text = String::from_utf8_lossy(&line);
    let id = strip_terminator(&text).trim();
    if id.len() > limit {
        return Err(RegistrationError::TooLong { limit });
    }
    id.parse()
        .map_err(|_| RegistrationError::InvalidId(id.to_string()))
}

/// Accept user client connections until shutdown.
pub async fn run_client_listener(
    listener: TcpListener,
    registry: ClientRegistry,
    max_client_id_bytes: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(addr = ?listener.local_addr().ok(), "Client listener started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown_requested(&mut shutdown_rx) => {
                info!("Client listener received shutdown signal");
                break;
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "Client connected");
                    tokio::spawn(handle_client(
                        stream,
                        peer,
                        registry.clone(),
                        max_client_id_bytes,
                        shutdown_rx.clone(),
                    ));
                }
                Err(e) => {
                    error!("Failed to accept client connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    registry: ClientRegistry,
    max_client_id_bytes: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, error = %e, "Failed to set TCP_NODELAY");
    }
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let registration = tokio::select! {
        biased;

        _ = shutdown_requested(&mut shutdown_rx) => return,
        registration = read_user_id(&mut reader, max_client_id_bytes) => registration,
    };
    let user_id = match registration {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!(%peer, error = %e, "Rejecting client");
            return;
        }
    };

    let connection = registry
        .register_client(user_id, SocketTransport::new(write_half))
        .await;

    // Clients are not expected to send anything after their id.
    let mut discard = tokio::io::sink();
    tokio::select! {
        biased;

        _ = shutdown_requested(&mut shutdown_rx) => {}
        _ = connection.closed() => {
            debug!(%peer, user_id, "Connection closed by server");
            return;
        }
        drained = tokio::io::copy(&mut reader, &mut discard) => {
            match drained {
                Ok(_) => debug!(%peer, user_id, "Client disconnected"),
                Err(e) => debug!(%peer, user_id, error = %e, "Client read failed"),
            }
        }
    }

    registry.unregister_connection(&connection).await;
}
