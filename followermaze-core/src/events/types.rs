//! Event value types.
//!
//! An [`Event`] is immutable once parsed. It carries the text line exactly
//! as the event source sent it so that recipients can be handed the
//! exact record without any reformatting.

use std::fmt;

/// Position of an event in the global total order. 1-based.
pub type SequenceNumber = u64;

/// Identifier of a user, as used both by events and by registering clients.
pub type UserId = u64;

/// What an event does, together with the user ids it involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `from` starts following `to`; `to` is notified.
    Follow { from: UserId, to: UserId },
    /// `from` stops following `to`; nobody is notified.
    Unfollow { from: UserId, to: UserId },
    /// Every connected client is notified.
    Broadcast,
    /// Only `to` is notified.
    PrivateMessage { from: UserId, to: UserId },
    /// Every current follower of `from` is notified.
    StatusUpdate { from: UserId },
}

impl EventKind {
    /// The single-letter code used on the wire.
    pub fn code(&self) -> char {
        match self {
            EventKind::Follow { .. } => 'F',
            EventKind::Unfollow { .. } => 'U',
            EventKind::Broadcast => 'B',
            EventKind::PrivateMessage { .. } => 'P',
            EventKind::StatusUpdate { .. } => 'S',
        }
    }

    pub fn from_user_id(&self) -> Option<UserId> {
        match *self {
            EventKind::Follow { from, .. }
            | EventKind::Unfollow { from, .. }
            | EventKind::PrivateMessage { from, .. }
            | EventKind::StatusUpdate { from } => Some(from),
            EventKind::Broadcast => None,
        }
    }

    pub fn to_user_id(&self) -> Option<UserId> {
        match *self {
            EventKind::Follow { to, .. }
            | EventKind::Unfollow { to, .. }
            | EventKind::PrivateMessage { to, .. } => Some(to),
            EventKind::Broadcast | EventKind::StatusUpdate { .. } => None,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            EventKind::Follow { .. } => "follow",
            EventKind::Unfollow { .. } => "unfollow",
            EventKind::Broadcast => "broadcast",
            EventKind::PrivateMessage { .. } => "private message",
            EventKind::StatusUpdate { .. } => "status update",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed, sequence-numbered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    sequence: SequenceNumber,
    kind: EventKind,
    payload: String,
}

impl Event {
    /// Build an event from its parts.
    ///
    /// `payload` is the record text without terminator; it is what
    /// recipients receive.
    pub fn new(sequence: SequenceNumber, kind: EventKind, payload: impl Into<String>) -> Self {
        Self {
            sequence,
            kind,
            payload: payload.into(),
        }
    }

    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn from_user_id(&self) -> Option<UserId> {
        self.kind.from_user_id()
    }

    pub fn to_user_id(&self) -> Option<UserId> {
        self.kind.to_user_id()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.sequence, self.kind)?;
        if let Some(from) = self.from_user_id() {
            write!(f, " from {from}")?;
        }
        if let Some(to) = self.to_user_id() {
            write!(f, " to {to}")?;
        }
        Ok(())
    }
}
