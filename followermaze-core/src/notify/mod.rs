//! Notification delivery: transports and per-client ordered queues.

mod hub;
mod transport;

pub use hub::NotificationHub;
pub use transport::{SocketTransport, Transport, TransportError};
