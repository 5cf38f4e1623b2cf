//! Dataset node lifecycle: the per-node reducer, its ingestion tasks and the
//! spreadsheet refresh timers.

pub mod ingest;
pub mod poll;
pub mod reducer;

pub use ingest::{spawn_ingestion, IngestionEvent};
pub use poll::PollTimers;
pub use reducer::{DatasetCommand, DatasetEffect, DatasetPhase, DatasetReducer, IngestionOutcome};
