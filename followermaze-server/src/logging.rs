//! Tracing subscriber setup.

use crate::config::runtime::LoggingConfig;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

/// Swaps the active filter at runtime.
pub type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

/// Build the filter from `RUST_LOG`, falling back to the configured
/// directives.
pub fn build_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Initialize the tracing subscriber and return a handle for reloading its
/// filter.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<LogFilterHandle> {
    let (filter, handle) = reload::Layer::new(build_filter(&config.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer()).try_init()?;
    }
    Ok(handle)
}
