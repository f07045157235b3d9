//! annal-core - Core library for annal.
//!
//! This crate provides field-level history tracking for persisted records:
//! serializing a record's fields into a snapshot, diffing snapshots to find
//! changed fields, persisting historical records in SQLite, and archiving
//! history rows older than a retention cutoff into a separate table.
//!
//! # Example
//!
//! ```ignore
//! use annal_core::{diff_fields, serialize, HistoryStore, ModelSchema, RemovedRelations};
//!
//! let schema = ModelSchema::new("ticket")
//!     .scalar("title")
//!     .foreign_key("assignee")
//!     .many_valued("tags");
//!
//! let current = serialize(&record, &schema, &RemovedRelations::default())?;
//! let diff = diff_fields(&current, &previous, &schema.excluded_fields);
//!
//! let store = HistoryStore::open("history.db")?;
//! store.record("ticket", "42", HistoryType::Update, &diff.changed, &current, None)?;
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod schema;
pub mod snapshot;

// Re-export commonly used types
pub use config::AnnalConfig;
pub use error::{AnnalError, AnnalResult};
pub use history::{
    ArchiveOutcome, HistoricalRecord, HistoryStore, HistoryType, RetentionPeriod,
};
pub use schema::{FieldDescriptor, FieldKind, ModelSchema};
pub use snapshot::{
    diff_fields, serialize, FieldAccessError, FieldDiff, FieldSource, FieldValue,
    RemovedRelations, Snapshot,
};
