//! Event model.
//!
//! This module provides the typed events, the wire parser and the channel
//! infrastructure that carries events and notifications between tasks.
//!
//! # Event Flow
//!
//! 1. Event intake parses each line with [`parse`] and sends the [`Event`]
//!    over the intake channel.
//! 2. The sequencing engine releases events strictly by sequence number.
//! 3. Fan-out turns each released event into payloads on the notification
//!    channels of the affected clients.

pub mod channels;
pub mod parse;
pub mod types;

pub use channels::{
    DEFAULT_INTAKE_BUFFER, EventIntakeReceiver, EventIntakeSender, NotificationReceiver,
    NotificationSender, event_intake_channel, notification_channel,
};
pub use parse::{ParseError, parse};
pub use types::{Event, EventKind, SequenceNumber, UserId};
