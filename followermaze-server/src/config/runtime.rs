//! Validated configuration handed to the rest of the server.

use followermaze_sdk::LineTerminator;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub event_listen: SocketAddr,
    pub client_listen: SocketAddr,
    pub line_terminator: LineTerminator,
    pub max_client_id_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerConfig {
    pub intake_buffer: usize,
    pub stall_report_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}
