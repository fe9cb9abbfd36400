//! Channel factories and handles.
//!
//! Two kinds of queues connect the concurrency domains:
//!
//! - a bounded intake channel carrying parsed [`Event`]s from the event
//!   source reader into the sequencing engine, so a fast source is slowed
//!   down instead of growing memory without limit;
//! - one unbounded notification channel per client connection, carrying
//!   framed payloads from fan-out to that connection's delivery worker.
//!   Fan-out must never wait on a slow client, hence unbounded.

use bytes::Bytes;
use tokio::sync::mpsc;

use super::types::Event;

/// Default buffer size for the event intake channel.
pub const DEFAULT_INTAKE_BUFFER: usize = 256;

/// Sender handle for parsed events.
pub type EventIntakeSender = mpsc::Sender<Event>;
/// Receiver handle for parsed events.
pub type EventIntakeReceiver = mpsc::Receiver<Event>;

/// Sender handle for a single client's outbound payloads.
pub type NotificationSender = mpsc::UnboundedSender<Bytes>;
/// Receiver handle for a single client's outbound payloads.
pub type NotificationReceiver = mpsc::UnboundedReceiver<Bytes>;

/// Create a new event intake channel holding at most `buffer` events.
///
/// A `buffer` of zero is bumped to one, since tokio rejects empty channels.
pub fn event_intake_channel(buffer: usize) -> (EventIntakeSender, EventIntakeReceiver) {
    mpsc::channel(buffer.max(1))
}

/// Create a new notification channel for one client connection.
pub fn notification_channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::unbounded_channel()
}
