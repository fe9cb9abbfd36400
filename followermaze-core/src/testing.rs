//! Helpers shared by the unit tests of this crate.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, Lines};

use crate::events::{Event, SequenceNumber};
use crate::notify::SocketTransport;
use crate::sequencing::EventProcessor;

/// Records every event it is handed.
#[derive(Debug, Default)]
pub struct RecordingProcessor {
    pub events: Vec<Event>,
}

impl RecordingProcessor {
    pub fn sequences(&self) -> Vec<SequenceNumber> {
        self.events.iter().map(Event::sequence).collect()
    }

    pub fn payloads(&self) -> Vec<&str> {
        self.events.iter().map(Event::payload).collect()
    }
}

#[async_trait]
impl EventProcessor for RecordingProcessor {
    async fn process_event(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// The remote end of an in-memory client connection.
pub struct Peer {
    lines: Lines<BufReader<DuplexStream>>,
}

impl Peer {
    /// Next line written by the server, or `None` once the server side
    /// has been closed or dropped.
    pub async fn next_line(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .ok()?
            .ok()?
    }

    /// Assert that nothing arrives within a short window.
    pub async fn assert_silent(&mut self) {
        let got = tokio::time::timeout(Duration::from_millis(100), self.lines.next_line()).await;
        assert!(
            !matches!(got, Ok(Ok(Some(_)))),
            "unexpected line: {got:?}"
        );
    }
}

/// An in-memory transport and the peer reading from it.
pub fn duplex_transport() -> (SocketTransport<DuplexStream>, Peer) {
    let (server_side, client_side) = tokio::io::duplex(64 * 1024);
    (
        SocketTransport::new(server_side),
        Peer {
            lines: BufReader::new(client_side).lines(),
        },
    )
}
