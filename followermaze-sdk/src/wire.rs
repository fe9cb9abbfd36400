//! Line-oriented wire protocol.
//!
//! # Protocol
//!
//! 1. The event source connects to the event port and streams records
//!    such as `42|F|7|9`, `43|B` or `44|S|7`, one per line.
//! 2. A user client connects to the client port and sends a single line
//!    holding its own user id, e.g. `9`.
//! 3. The server then writes every event record addressed to that user,
//!    byte-for-byte as the event source sent it, one per line, in
//!    ascending sequence order.
//!
//! The server never writes error text to either peer. A rejected client
//! simply sees its connection closed.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Port the event source connects to unless configured otherwise.
pub const DEFAULT_EVENT_PORT: u16 = 9090;

/// Port user clients connect to unless configured otherwise.
pub const DEFAULT_CLIENT_PORT: u16 = 9099;

/// Record terminator used when writing lines to a peer.
///
/// Readers accept both forms regardless of this setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    /// A single line feed (`\n`).
    #[default]
    Lf,
    /// Carriage return followed by line feed (`\r\n`).
    Crlf,
}

impl LineTerminator {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineTerminator::Lf => b"\n",
            LineTerminator::Crlf => b"\r\n",
        }
    }

    /// Append this terminator to `line`, producing one complete record.
    pub fn frame(self, line: &str) -> Bytes {
        let terminator = self.as_bytes();
        let mut buf = BytesMut::with_capacity(line.len() + terminator.len());
        buf.put_slice(line.as_bytes());
        buf.put_slice(terminator);
        buf.freeze()
    }
}

/// Remove any trailing `\r` / `\n` bytes from a received line.
pub fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
