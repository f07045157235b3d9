//! SQLite-backed history store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::{AnnalError, AnnalResult};
use crate::snapshot::Snapshot;

/// Change type for historical records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryType {
    Create,
    Update,
    Delete,
}

impl HistoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryType::Create => "CREATE",
            HistoryType::Update => "UPDATE",
            HistoryType::Delete => "DELETE",
        }
    }
}

/// A persisted snapshot of a tracked record. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRecord {
    /// Record ID.
    pub id: String,
    /// Tracked model name.
    pub model: String,
    /// Id of the tracked object.
    pub object_id: String,
    /// Change type ("CREATE", "UPDATE", "DELETE").
    pub history_type: String,
    /// Names of the fields that changed in this revision.
    pub history_diff: Vec<String>,
    /// Field values at this revision.
    pub data: Snapshot,
    /// When the change was recorded.
    pub history_date: DateTime<Utc>,
}

/// Column set shared by the live and archive tables. The archival job's
/// insert-from-select names the columns explicitly from this list, so the
/// two tables must stay structurally identical.
pub(crate) const COLUMNS: &str = "id, model, object_id, history_type, history_diff, data, history_date";

pub(crate) const LIVE_TABLE: &str = "historical_records";
pub(crate) const ARCHIVE_TABLE: &str = "archived_historical_records";

/// SQLite-based store for historical records and their archive.
pub struct HistoryStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    /// Open (or create) a history store at the given path.
    pub fn open(db_path: impl AsRef<Path>) -> AnnalResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path.as_ref())?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory history store (useful for testing).
    pub fn in_memory() -> AnnalResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create the live and archive tables if they don't exist.
    ///
    /// Both tables carry the identical column set; only the archival job
    /// writes to the archive table.
    fn init_schema(&self) -> AnnalResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS historical_records (
                id            TEXT PRIMARY KEY,
                model         TEXT NOT NULL,
                object_id     TEXT NOT NULL,
                history_type  TEXT NOT NULL,
                history_diff  TEXT NOT NULL,
                data          TEXT NOT NULL,
                history_date  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_historical_records_object
                ON historical_records(model, object_id);
            CREATE INDEX IF NOT EXISTS idx_historical_records_date
                ON historical_records(history_date);

            CREATE TABLE IF NOT EXISTS archived_historical_records (
                id            TEXT PRIMARY KEY,
                model         TEXT NOT NULL,
                object_id     TEXT NOT NULL,
                history_type  TEXT NOT NULL,
                history_diff  TEXT NOT NULL,
                data          TEXT NOT NULL,
                history_date  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_archived_historical_records_date
                ON archived_historical_records(history_date);
            ",
        )?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> AnnalResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AnnalError::database(e.to_string()))
    }

    /// Record a historical entry. Returns the new record's id.
    ///
    /// `history_date` defaults to now; timestamps persist as RFC 3339 UTC,
    /// which compares chronologically as text.
    pub fn record(
        &self,
        model: &str,
        object_id: &str,
        history_type: HistoryType,
        history_diff: &[String],
        data: &Snapshot,
        history_date: Option<DateTime<Utc>>,
    ) -> AnnalResult<String> {
        let conn = self.lock()?;
        let id = Uuid::new_v4().to_string();
        let history_date = history_date.unwrap_or_else(Utc::now);

        conn.execute(
            "INSERT INTO historical_records
             (id, model, object_id, history_type, history_diff, data, history_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                model,
                object_id,
                history_type.as_str(),
                serde_json::to_string(history_diff)?,
                serde_json::to_string(data)?,
                history_date.to_rfc3339(),
            ],
        )?;

        Ok(id)
    }

    /// Get the live history for one object, newest first.
    pub fn for_object(&self, model: &str, object_id: &str) -> AnnalResult<Vec<HistoricalRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, model, object_id, history_type, history_diff, data, history_date
             FROM historical_records
             WHERE model = ?1 AND object_id = ?2
             ORDER BY history_date DESC",
        )?;

        let records = stmt
            .query_map(params![model, object_id], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        records.into_iter().map(parse_record).collect()
    }

    /// Count of live history rows.
    pub fn count(&self) -> AnnalResult<usize> {
        self.count_table(LIVE_TABLE)
    }

    /// Count of archived history rows.
    pub fn count_archived(&self) -> AnnalResult<usize> {
        self.count_table(ARCHIVE_TABLE)
    }

    fn count_table(&self, table: &str) -> AnnalResult<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

/// Raw row before JSON fields are parsed.
struct RawRecord {
    id: String,
    model: String,
    object_id: String,
    history_type: String,
    history_diff: String,
    data: String,
    history_date: String,
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        model: row.get(1)?,
        object_id: row.get(2)?,
        history_type: row.get(3)?,
        history_diff: row.get(4)?,
        data: row.get(5)?,
        history_date: row.get(6)?,
    })
}

fn parse_record(raw: RawRecord) -> AnnalResult<HistoricalRecord> {
    let history_date = DateTime::parse_from_rfc3339(&raw.history_date)
        .map_err(|e| AnnalError::database(format!("invalid history_date: {e}")))?
        .with_timezone(&Utc);

    Ok(HistoricalRecord {
        id: raw.id,
        model: raw.model,
        object_id: raw.object_id,
        history_type: raw.history_type,
        history_diff: serde_json::from_str(&raw.history_diff)?,
        data: serde_json::from_str(&raw.data)?,
        history_date,
    })
}
