//! Holding area for events that arrived ahead of their turn.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::events::{Event, SequenceNumber};

/// Events keyed by sequence number, smallest first.
///
/// At most one event is held per sequence number.
#[derive(Debug, Default)]
pub struct ReorderBuffer {
    events: BTreeMap<SequenceNumber, Event>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `event`. Returns `false`, leaving the buffer unchanged, if an
    /// event with the same sequence number is already held.
    pub fn insert(&mut self, event: Event) -> bool {
        match self.events.entry(event.sequence()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(event);
                true
            }
        }
    }

    pub fn contains(&self, sequence: SequenceNumber) -> bool {
        self.events.contains_key(&sequence)
    }

    /// The event with the smallest sequence number, if any.
    pub fn peek_min(&self) -> Option<&Event> {
        self.events.first_key_value().map(|(_, event)| event)
    }

    /// Remove and return the smallest event, but only if its sequence
    /// number is exactly `sequence`.
    pub fn pop_min_if(&mut self, sequence: SequenceNumber) -> Option<Event> {
        let entry = self.events.first_entry()?;
        if *entry.key() == sequence {
            Some(entry.remove())
        } else {
            None
        }
    }

    pub fn lowest(&self) -> Option<SequenceNumber> {
        self.events.first_key_value().map(|(sequence, _)| *sequence)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
