//! Configuration module for followermaze-server.
//!
//! Handles loading configuration from an optional TOML file and CLI
//! arguments, then validating the result.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{LoggingConfig, SequencerConfig, ServerConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub sequencer: SequencerConfig,
    pub logging: LoggingConfig,
}

/// Listen addresses given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenOverrides {
    pub event_listen: Option<SocketAddr>,
    pub client_listen: Option<SocketAddr>,
}

/// Configuration loader that handles the complete loading process.
#[derive(Debug)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    overrides: ListenOverrides,
}

impl ConfigLoader {
    /// Create a new config loader. Without a path, every setting takes its
    /// default.
    pub fn new(config_path: Option<&Path>, overrides: ListenOverrides) -> Self {
        Self {
            config_path: config_path.map(Path::to_path_buf),
            overrides,
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if any
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = match &self.config_path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
                        path: path.clone(),
                        source,
                    })?;
                toml::from_str(&content)?
            }
            None => FileConfig::default(),
        };

        if let Some(addr) = self.overrides.event_listen {
            file_config.server.event_listen = addr;
        }
        if let Some(addr) = self.overrides.client_listen {
            file_config.server.client_listen = addr;
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    // Port 0 lets the OS pick, so two such listeners never collide.
    if config.server.event_listen == config.server.client_listen
        && config.server.event_listen.port() != 0
    {
        return Err(ConfigError::ValidationError(format!(
            "event and client listeners share the address {}",
            config.server.event_listen
        )));
    }
    if config.server.max_client_id_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "max_client_id_bytes must be at least 1".to_string(),
        ));
    }
    if config.sequencer.intake_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "intake_buffer must be at least 1".to_string(),
        ));
    }
    if config.sequencer.stall_report_secs == 0 {
        return Err(ConfigError::ValidationError(
            "stall_report_secs must be at least 1".to_string(),
        ));
    }
    if let Err(e) = EnvFilter::try_new(&config.logging.filter) {
        return Err(ConfigError::ValidationError(format!(
            "invalid logging filter {:?}: {}",
            config.logging.filter, e
        )));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        server: ServerConfig {
            event_listen: file_config.server.event_listen,
            client_listen: file_config.server.client_listen,
            line_terminator: file_config.server.line_terminator,
            max_client_id_bytes: file_config.server.max_client_id_bytes,
        },
        sequencer: SequencerConfig {
            intake_buffer: file_config.sequencer.intake_buffer,
            stall_report_interval: Duration::from_secs(file_config.sequencer.stall_report_secs),
        },
        logging: LoggingConfig {
            filter: file_config.logging.filter,
            json: file_config.logging.json,
        },
    }
}
