//! Parser from a wire record to a typed [`Event`].

use std::str::FromStr;

use followermaze_sdk::strip_terminator;
use thiserror::Error;

use super::types::{Event, EventKind, SequenceNumber, UserId};

const FIELD_SEPARATOR: char = '|';

/// Reasons an event line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty event line")]
    Empty,

    #[error("event line {0:?} has no kind field")]
    MissingKind(String),

    #[error("unknown event kind {0:?}")]
    UnknownKind(String),

    #[error("{kind} event expects {expected} fields, found {found}")]
    FieldCount {
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid sequence number {0:?}")]
    InvalidSequence(String),

    #[error("invalid user id {0:?}")]
    InvalidUserId(String),
}

/// Parse one record into an [`Event`].
///
/// Any trailing `\r`/`\n` is ignored. The returned event's payload is the
/// record text without its terminator.
pub fn parse(line: &str) -> Result<Event, ParseError> {
    let line = strip_terminator(line);
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    let [sequence, code, rest @ ..] = fields.as_slice() else {
        return Err(ParseError::MissingKind(line.to_owned()));
    };

    let kind = match *code {
        "F" => {
            let [from, to] = user_ids::<2>("follow", rest)?;
            EventKind::Follow { from, to }
        }
        "U" => {
            let [from, to] = user_ids::<2>("unfollow", rest)?;
            EventKind::Unfollow { from, to }
        }
        "B" => {
            user_ids::<0>("broadcast", rest)?;
            EventKind::Broadcast
        }
        "P" => {
            let [from, to] = user_ids::<2>("private message", rest)?;
            EventKind::PrivateMessage { from, to }
        }
        "S" => {
            let [from] = user_ids::<1>("status update", rest)?;
            EventKind::StatusUpdate { from }
        }
        other => return Err(ParseError::UnknownKind(other.to_owned())),
    };

    let sequence = parse_sequence(sequence)?;
    Ok(Event::new(sequence, kind, line))
}

impl FromStr for Event {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse exactly `N` user ids from the fields following the kind code.
fn user_ids<const N: usize>(kind: &'static str, fields: &[&str]) -> Result<[UserId; N], ParseError> {
    if fields.len() != N {
        return Err(ParseError::FieldCount {
            kind,
            expected: N + 2,
            found: fields.len() + 2,
        });
    }

    let mut ids = [0; N];
    for (slot, raw) in ids.iter_mut().zip(fields) {
        *slot = raw
            .parse()
            .map_err(|_| ParseError::InvalidUserId((*raw).to_owned()))?;
    }
    Ok(ids)
}

fn parse_sequence(raw: &str) -> Result<SequenceNumber, ParseError> {
    raw.parse()
        .map_err(|_| ParseError::InvalidSequence(raw.to_owned()))
}
