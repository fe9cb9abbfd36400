//! Async TCP clients for both peer roles of the server.
//!
//! Gated behind the `client` cargo feature so crates that only need the
//! wire types do not pull in `tokio`.

mod event_source;
mod user;

pub use event_source::EventSourceClient;
pub use user::UserClient;

use std::time::Duration;

/// Errors produced by the SDK clients.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Socket-level failure (connect, read, write).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// No line arrived within the given window.
    #[error("no line received within {0:?}")]
    Timeout(Duration),
}
