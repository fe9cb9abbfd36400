//! Long-running tasks of the core.

mod sequencing_engine;

pub use sequencing_engine::{DEFAULT_STALL_REPORT_INTERVAL, SequencingEngine};
