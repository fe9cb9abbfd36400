//! Turns an out-of-order event stream into a gapless, ascending one.
//!
//! [`Sequencer`] is a plain state machine over `(next_expected, buffer)`.
//! It owns no task and takes no locks: whoever owns it by `&mut` is the
//! single logical thread of control that the fan-out logic relies on.
//! In the server that owner is the
//! [`SequencingEngine`](crate::processors::SequencingEngine).
//!
//! A missing sequence number holds back everything after it for as long
//! as it stays missing. Nothing ever skips ahead.

mod reorder_buffer;

pub use reorder_buffer::ReorderBuffer;

use async_trait::async_trait;

use crate::events::{Event, SequenceNumber};

/// First sequence number a fresh sequencer waits for.
pub const FIRST_SEQUENCE: SequenceNumber = 1;

/// Something that consumes events in sequence order.
#[async_trait]
pub trait EventProcessor: Send {
    /// Handle one event. Called exactly once per sequence number, in
    /// ascending order, never concurrently with itself.
    async fn process_event(&mut self, event: Event);

    /// Periodic maintenance hook, run between events.
    fn housekeeping(&mut self) {}
}

/// Result of [`Sequencer::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Held until its turn comes (possibly right away on the next drain).
    Buffered,
    /// Another event with this sequence number is already waiting.
    Duplicate,
    /// This sequence number has already been processed.
    AlreadyProcessed,
}

/// Point-in-time view of a sequencer, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerStatus {
    /// The sequence number the sequencer is waiting for.
    pub next_expected: SequenceNumber,
    /// Number of events held back waiting for `next_expected`.
    pub buffered: usize,
    /// Smallest held-back sequence number, if any.
    pub lowest_buffered: Option<SequenceNumber>,
    /// Total number of events released so far.
    pub processed: u64,
}

impl SequencerStatus {
    /// Whether events are waiting on a sequence number that has not
    /// arrived.
    pub fn is_stalled(&self) -> bool {
        self.buffered > 0
    }
}

impl Default for SequencerStatus {
    fn default() -> Self {
        Self {
            next_expected: FIRST_SEQUENCE,
            buffered: 0,
            lowest_buffered: None,
            processed: 0,
        }
    }
}

/// Reorder buffer plus the `next_expected` cursor.
#[derive(Debug)]
pub struct Sequencer {
    next_expected: SequenceNumber,
    buffer: ReorderBuffer,
    processed: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::starting_at(FIRST_SEQUENCE)
    }

    /// A sequencer whose first expected event is `first`.
    pub fn starting_at(first: SequenceNumber) -> Self {
        Self {
            next_expected: first,
            buffer: ReorderBuffer::new(),
            processed: 0,
        }
    }

    /// Accept an event for later release.
    ///
    /// Events below the cursor or already buffered are dropped; the first
    /// event seen for a sequence number wins.
    pub fn submit(&mut self, event: Event) -> Submission {
        if event.sequence() < self.next_expected {
            return Submission::AlreadyProcessed;
        }
        if self.buffer.insert(event) {
            Submission::Buffered
        } else {
            Submission::Duplicate
        }
    }

    /// Take the next event if it is the one the cursor is waiting for,
    /// advancing the cursor past it.
    pub fn next_ready(&mut self) -> Option<Event> {
        let event = self.buffer.pop_min_if(self.next_expected)?;
        self.next_expected += 1;
        self.processed += 1;
        Some(event)
    }

    /// Release every contiguous event starting at the cursor into
    /// `processor`, one at a time. Returns how many were released.
    ///
    /// Stops at the first gap; the next [`submit`](Self::submit) that
    /// fills it makes the following drain pick up where this one stopped.
    pub async fn drain<P>(&mut self, processor: &mut P) -> usize
    where
        P: EventProcessor + ?Sized,
    {
        let mut released = 0;
        while let Some(event) = self.next_ready() {
            processor.process_event(event).await;
            released += 1;
        }
        released
    }

    pub fn next_expected(&self) -> SequenceNumber {
        self.next_expected
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn status(&self) -> SequencerStatus {
        SequencerStatus {
            next_expected: self.next_expected,
            buffered: self.buffer.len(),
            lowest_buffered: self.buffer.lowest(),
            processed: self.processed,
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::parse;
    use crate::testing::RecordingProcessor;
    use rand::seq::SliceRandom;

    fn events(lines: &[&str]) -> Vec<Event> {
        lines.iter().map(|line| parse(line).unwrap()).collect()
    }

    async fn submit_all(
        sequencer: &mut Sequencer,
        processor: &mut RecordingProcessor,
        events: Vec<Event>,
    ) {
        for event in events {
            sequencer.submit(event);
            sequencer.drain(processor).await;
        }
    }

    #[tokio::test]
    async fn test_any_arrival_order_is_processed_in_sequence() {
        let ordered: Vec<Event> = (1..=50)
            .map(|n| parse(&format!("{n}|S|{}", n % 7)).unwrap())
            .collect();
        let mut rng = rand::rng();

        for _ in 0..200 {
            let mut shuffled = ordered.clone();
            shuffled.shuffle(&mut rng);

            let mut sequencer = Sequencer::new();
            let mut processor = RecordingProcessor::default();
            submit_all(&mut sequencer, &mut processor, shuffled).await;

            assert_eq!(processor.sequences(), (1..=50).collect::<Vec<_>>());
            assert_eq!(sequencer.next_expected(), 51);
            assert_eq!(sequencer.buffered(), 0);
        }
    }

    #[tokio::test]
    async fn test_reverse_order_releases_everything_on_last_submit() {
        let mut sequencer = Sequencer::new();
        let mut processor = RecordingProcessor::default();

        for n in (2..=10).rev() {
            sequencer.submit(parse(&format!("{n}|B")).unwrap());
            assert_eq!(sequencer.drain(&mut processor).await, 0);
        }
        assert_eq!(sequencer.buffered(), 9);

        sequencer.submit(parse("1|B").unwrap());
        assert_eq!(sequencer.drain(&mut processor).await, 10);
        assert_eq!(processor.sequences(), (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_gap_holds_back_later_events() {
        let mut sequencer = Sequencer::new();
        let mut processor = RecordingProcessor::default();

        submit_all(
            &mut sequencer,
            &mut processor,
            events(&["1|B", "2|B", "4|B"]),
        )
        .await;
        assert_eq!(processor.sequences(), vec![1, 2]);

        let status = sequencer.status();
        assert_eq!(status.next_expected, 3);
        assert_eq!(status.buffered, 1);
        assert_eq!(status.lowest_buffered, Some(4));
        assert!(status.is_stalled());

        submit_all(&mut sequencer, &mut processor, events(&["3|B"])).await;
        assert_eq!(processor.sequences(), vec![1, 2, 3, 4]);
        assert!(!sequencer.status().is_stalled());
        assert_eq!(sequencer.status().processed, 4);
    }

    #[tokio::test]
    async fn test_duplicates_are_processed_once() {
        let mut sequencer = Sequencer::new();
        let mut processor = RecordingProcessor::default();

        assert_eq!(sequencer.submit(parse("2|B").unwrap()), Submission::Buffered);
        assert_eq!(
            sequencer.submit(parse("2|S|5").unwrap()),
            Submission::Duplicate
        );
        assert_eq!(sequencer.submit(parse("1|B").unwrap()), Submission::Buffered);
        sequencer.drain(&mut processor).await;

        assert_eq!(
            sequencer.submit(parse("1|P|1|2").unwrap()),
            Submission::AlreadyProcessed
        );
        assert_eq!(sequencer.drain(&mut processor).await, 0);
        assert_eq!(processor.payloads(), vec!["1|B", "2|B"]);
    }

    #[tokio::test]
    async fn test_sequence_zero_is_never_processed() {
        let mut sequencer = Sequencer::new();
        let mut processor = RecordingProcessor::default();

        assert_eq!(
            sequencer.submit(parse("0|B").unwrap()),
            Submission::AlreadyProcessed
        );
        assert_eq!(sequencer.drain(&mut processor).await, 0);
    }

    #[tokio::test]
    async fn test_starting_at_custom_cursor() {
        let mut sequencer = Sequencer::starting_at(100);
        let mut processor = RecordingProcessor::default();

        submit_all(&mut sequencer, &mut processor, events(&["101|B", "100|B"])).await;
        assert_eq!(processor.sequences(), vec![100, 101]);
    }
}
