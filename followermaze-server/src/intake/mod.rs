//! TCP intake for both peer roles.

pub mod clients;
pub mod event_source;

pub use clients::run_client_listener;
pub use event_source::run_event_listener;
