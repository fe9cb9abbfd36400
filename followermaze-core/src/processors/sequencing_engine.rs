//! SequencingEngine processor.
//!
//! The SequencingEngine is responsible for:
//! - Receiving parsed events from the intake channel
//! - Submitting them to the [`Sequencer`] and draining every event that
//!   has become contiguous into the [`EventProcessor`]
//! - Publishing a [`SequencerStatus`] after every submission
//! - Periodically warning when the sequencer is stalled on a gap
//!
//! It is the only task that ever touches the sequencer and the processor,
//! which is what lets the follower graph go without locks.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::events::{Event, EventIntakeReceiver};
use crate::sequencing::{EventProcessor, Sequencer, SequencerStatus, Submission};

/// Default interval between stall checks.
pub const DEFAULT_STALL_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Single consumer of the intake channel.
pub struct SequencingEngine<P> {
    sequencer: Sequencer,
    processor: P,
    intake_rx: EventIntakeReceiver,
    shutdown_rx: watch::Receiver<bool>,
    status_tx: watch::Sender<SequencerStatus>,
    stall_report_interval: Duration,
}

impl<P: EventProcessor> SequencingEngine<P> {
    /// Create a new SequencingEngine.
    ///
    /// # Arguments
    ///
    /// * `processor` - Receives every event in sequence order
    /// * `intake_rx` - Receiver for parsed events
    /// * `shutdown_rx` - Receiver for shutdown signal
    pub fn new(
        processor: P,
        intake_rx: EventIntakeReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let (status_tx, _) = watch::channel(SequencerStatus::default());
        Self {
            sequencer: Sequencer::new(),
            processor,
            intake_rx,
            shutdown_rx,
            status_tx,
            stall_report_interval: DEFAULT_STALL_REPORT_INTERVAL,
        }
    }

    /// Check for stalls every `interval` instead of the default.
    ///
    /// A zero interval is raised to one millisecond.
    pub fn with_stall_report_interval(mut self, interval: Duration) -> Self {
        self.stall_report_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Subscribe to status snapshots, published after every submission.
    pub fn subscribe_status(&self) -> watch::Receiver<SequencerStatus> {
        self.status_tx.subscribe()
    }

    /// Run until shutdown is signaled or the intake channel closes.
    pub async fn run(mut self) {
        info!("SequencingEngine started");

        let mut stall_ticker = tokio::time::interval(self.stall_report_interval);
        stall_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        stall_ticker.tick().await;
        let mut last_checked = self.sequencer.status();

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("SequencingEngine received shutdown signal");
                        break;
                    }
                }

                // Receive parsed events
                event = self.intake_rx.recv() => {
                    let Some(event) = event else {
                        info!("Event intake channel closed");
                        break;
                    };
                    self.handle_event(event).await;
                }

                _ = stall_ticker.tick() => {
                    last_checked = self.check_stall(last_checked);
                    self.processor.housekeeping();
                }
            }
        }

        let status = self.sequencer.status();
        info!(
            next_expected = status.next_expected,
            buffered = status.buffered,
            processed = status.processed,
            "SequencingEngine shutdown complete"
        );
    }

    async fn handle_event(&mut self, event: Event) {
        let sequence = event.sequence();

        match self.sequencer.submit(event) {
            Submission::Buffered => {}
            Submission::Duplicate => {
                debug!(sequence, "Ignoring duplicate of a buffered event");
                return;
            }
            Submission::AlreadyProcessed => {
                debug!(sequence, "Ignoring event that was already processed");
                return;
            }
        }

        let released = self.sequencer.drain(&mut self.processor).await;
        let status = self.sequencer.status();
        debug!(
            sequence,
            released,
            next_expected = status.next_expected,
            buffered = status.buffered,
            "Submitted event"
        );
        self.status_tx.send_replace(status);
    }

    /// Warn if events are waiting and the cursor has not moved since the
    /// previous check.
    fn check_stall(&self, previous: SequencerStatus) -> SequencerStatus {
        let status = self.sequencer.status();
        if status.is_stalled() && status.next_expected == previous.next_expected {
            warn!(
                next_expected = status.next_expected,
                buffered = status.buffered,
                lowest_buffered = ?status.lowest_buffered,
                "Sequencer stalled waiting for a missing event"
            );
        }
        status
    }
}
