//! Event source client: streams event records to the server.

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpStream, ToSocketAddrs};

use super::SdkError;
use crate::wire::LineTerminator;

/// A connection to the event port.
#[derive(Debug)]
pub struct EventSourceClient {
    writer: BufWriter<TcpStream>,
    terminator: LineTerminator,
}

impl EventSourceClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, SdkError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            writer: BufWriter::new(stream),
            terminator: LineTerminator::Lf,
        })
    }

    /// Use `terminator` for every record written from now on.
    pub fn with_terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }

    /// Write a single record and flush it.
    pub async fn send_line(&mut self, line: &str) -> Result<(), SdkError> {
        self.writer.write_all(&self.terminator.frame(line)).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write every record in `lines`, flushing once at the end.
    pub async fn send_all<I, S>(&mut self, lines: I) -> Result<(), SdkError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.writer
                .write_all(&self.terminator.frame(line.as_ref()))
                .await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Flush and close the connection.
    pub async fn finish(mut self) -> Result<(), SdkError> {
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}
