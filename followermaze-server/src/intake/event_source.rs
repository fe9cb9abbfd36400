//! Event source intake.
//!
//! Every accepted connection is read line by line. Each line is parsed and
//! the event handed to the sequencing engine over the bounded intake
//! channel, so a source that outpaces fan-out is simply read more slowly.

use crate::shutdown::shutdown_requested;
use followermaze_core::events::{EventIntakeSender, parse};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, error, info, warn};

/// Accept event source connections until shutdown.
pub async fn run_event_listener(
    listener: TcpListener,
    intake_tx: EventIntakeSender,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(addr = ?listener.local_addr().ok(), "Event listener started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown_requested(&mut shutdown_rx) => {
                info!("Event listener received shutdown signal");
                break;
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!(%peer, "Event source connected");
                    tokio::spawn(read_events(
                        stream,
                        peer,
                        intake_tx.clone(),
                        shutdown_rx.clone(),
                    ));
                }
                Err(e) => {
                    error!("Failed to accept event source connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

/// Forward every well-formed line of `reader` to the engine.
///
/// Returns the number of events forwarded.
pub async fn read_events<R>(
    reader: R,
    peer: SocketAddr,
    intake_tx: EventIntakeSender,
    mut shutdown_rx: watch::Receiver<bool>,
) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut lines = LinesStream::new(BufReader::new(reader).lines());
    let mut forwarded = 0;

    loop {
        let line = tokio::select! {
            biased;

            _ = shutdown_requested(&mut shutdown_rx) => break,
            line = lines.next() => line,
        };

        match line {
            Some(Ok(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse(&line) {
                    Ok(event) => {
                        if intake_tx.send(event).await.is_err() {
                            debug!(%peer, "Sequencing engine stopped, closing event source");
                            break;
                        }
                        forwarded += 1;
                    }
                    Err(e) => {
                        warn!(%peer, line = %line, error = %e, "Dropping malformed event");
                    }
                }
            }
            Some(Err(e)) if e.kind() == ErrorKind::InvalidData => {
                warn!(%peer, error = %e, "Dropping event line that is not UTF-8");
            }
            Some(Err(e)) => {
                warn!(%peer, error = %e, "Event source read failed");
                break;
            }
            None => break,
        }
    }

    info!(%peer, forwarded, "Event source disconnected");
    forwarded
}
