//! Historical record persistence and archival.
//!
//! Stores timestamped snapshots of tracked records in SQLite and moves
//! rows past their retention age into a structurally identical archive
//! table.

mod archive;
mod store;

pub use archive::{ArchiveOutcome, RetentionPeriod};
pub use store::{HistoricalRecord, HistoryStore, HistoryType};
