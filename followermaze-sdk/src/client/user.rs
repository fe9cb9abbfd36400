//! User client: registers an id and reads notifications.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use super::SdkError;
use crate::wire::{LineTerminator, strip_terminator};

/// A connected, registered user client.
///
/// The write half is kept open for the lifetime of the client: the server
/// treats a half-closed connection as a disconnect.
#[derive(Debug)]
pub struct UserClient {
    user_id: u64,
    lines: Lines<BufReader<OwnedReadHalf>>,
    _writer: OwnedWriteHalf,
}

impl UserClient {
    /// Connect to the client port and register as `user_id`.
    pub async fn connect(addr: impl ToSocketAddrs, user_id: u64) -> Result<Self, SdkError> {
        Self::connect_raw(addr, &user_id.to_string(), user_id).await
    }

    /// Connect and send `id_line` verbatim as the registration record.
    ///
    /// Useful for exercising how the server treats malformed ids.
    pub async fn connect_raw(
        addr: impl ToSocketAddrs,
        id_line: &str,
        user_id: u64,
    ) -> Result<Self, SdkError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, mut writer) = stream.into_split();

        writer.write_all(&LineTerminator::Lf.frame(id_line)).await?;
        writer.flush().await?;

        Ok(Self {
            user_id,
            lines: BufReader::new(reader).lines(),
            _writer: writer,
        })
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    /// Read the next record, without its terminator.
    ///
    /// Returns `Ok(None)` once the server has closed the connection.
    pub async fn next_line(&mut self) -> Result<Option<String>, SdkError> {
        let line = self.lines.next_line().await?;
        Ok(line.map(|l| strip_terminator(&l).to_owned()))
    }

    /// Like [`next_line`](Self::next_line) but gives up after `window`.
    pub async fn next_line_timeout(&mut self, window: Duration) -> Result<Option<String>, SdkError> {
        match tokio::time::timeout(window, self.next_line()).await {
            Ok(result) => result,
            Err(_) => Err(SdkError::Timeout(window)),
        }
    }
}
