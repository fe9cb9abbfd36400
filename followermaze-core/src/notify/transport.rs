//! The write side of a client connection.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Errors that can occur while writing to a client.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection was closed on our side before the write.
    #[error("connection closed")]
    Closed,

    /// The peer is gone or the socket failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte sink for one client.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Write all of `payload`. Returns the number of bytes written.
    async fn send(&mut self, payload: &[u8]) -> Result<usize, TransportError>;

    /// Shut the sink down. Errors are not interesting at this point and are
    /// swallowed.
    async fn close(&mut self);
}

/// [`Transport`] over any async writer, typically the write half of a
/// `TcpStream`.
#[derive(Debug)]
pub struct SocketTransport<W> {
    writer: W,
}

impl<W> SocketTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> Transport for SocketTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, payload: &[u8]) -> Result<usize, TransportError> {
        self.writer.write_all(payload).await?;
        self.writer.flush().await?;
        Ok(payload.len())
    }

    async fn close(&mut self) {
        if let Err(e) = self.writer.shutdown().await {
            debug!(error = %e, "Error shutting down client writer");
        }
    }
}
