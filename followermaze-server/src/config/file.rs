//! TOML file configuration structures.
//!
//! These structs directly map to the `followermaze.toml` file format. Every
//! section and key is optional.

use followermaze_sdk::{DEFAULT_CLIENT_PORT, DEFAULT_EVENT_PORT, LineTerminator};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub sequencer: SequencerConfig,
    pub logging: LoggingConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Where the event source connects (e.g., "0.0.0.0:9090").
    pub event_listen: SocketAddr,
    /// Where user clients connect (e.g., "0.0.0.0:9099").
    pub client_listen: SocketAddr,
    /// Terminator appended to every notification.
    pub line_terminator: LineTerminator,
    /// Longest accepted client id line, terminator excluded.
    pub max_client_id_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            event_listen: any_addr(DEFAULT_EVENT_PORT),
            client_listen: any_addr(DEFAULT_CLIENT_PORT),
            line_terminator: LineTerminator::Lf,
            max_client_id_bytes: 64,
        }
    }
}

fn any_addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
}

/// Sequencer configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequencerConfig {
    /// Parsed events that may wait for the engine before the event source
    /// reader is paused.
    pub intake_buffer: usize,
    /// Seconds between stall checks.
    pub stall_report_secs: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            intake_buffer: 256,
            stall_report_secs: 10,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives. `RUST_LOG` takes
    /// precedence when set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}
