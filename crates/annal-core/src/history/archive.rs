//! Archival of history rows past their retention age.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use tracing::{info, warn};

use super::store::{HistoryStore, ARCHIVE_TABLE, COLUMNS, LIVE_TABLE};
use crate::error::AnnalResult;

/// Retention cutoff duration, in days or weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPeriod {
    Days(u32),
    Weeks(u32),
}

impl RetentionPeriod {
    /// Resolve the period from optional day/week parameters.
    ///
    /// Zero counts as not supplied. Returns `None` when neither parameter
    /// is given; the caller is expected to report the missing-parameter
    /// error. When both are given, weeks takes precedence and a warning is
    /// logged.
    pub fn resolve(days: Option<u32>, weeks: Option<u32>) -> Option<Self> {
        let days = days.filter(|d| *d > 0);
        let weeks = weeks.filter(|w| *w > 0);
        match (days, weeks) {
            (None, None) => None,
            (Some(_), Some(weeks)) => {
                warn!("both days and weeks supplied; weeks will be used as the delimiter");
                Some(RetentionPeriod::Weeks(weeks))
            }
            (None, Some(weeks)) => Some(RetentionPeriod::Weeks(weeks)),
            (Some(days), None) => Some(RetentionPeriod::Days(days)),
        }
    }

    fn duration(&self) -> chrono::Duration {
        match self {
            RetentionPeriod::Days(days) => chrono::Duration::days(*days as i64),
            RetentionPeriod::Weeks(weeks) => chrono::Duration::weeks(*weeks as i64),
        }
    }

    /// Cutoff date for the given reference time. Only the date portion is
    /// used for comparison: rows strictly older than this date get
    /// archived.
    pub fn cutoff(&self, now: DateTime<Utc>) -> NaiveDate {
        (now - self.duration()).date_naive()
    }
}

/// Result of one archival run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOutcome {
    /// Number of rows moved to the archive table.
    pub archived: u64,
    /// The cutoff date that was applied.
    pub cutoff: NaiveDate,
}

impl HistoryStore {
    /// Move all history rows with `history_date` strictly older than the
    /// retention cutoff into the archive table.
    ///
    /// Count, set-based insert-from-select, and set-based delete run inside
    /// one transaction: a failure in any statement rolls back the whole
    /// run, so no partial archive state is possible.
    ///
    /// RFC 3339 timestamps compare chronologically as text, and rows on the
    /// cutoff date itself sort after the bare date string, so a plain `<`
    /// against the date gives strictly-older-than-date semantics.
    pub fn archive_older_than(
        &self,
        period: RetentionPeriod,
        now: DateTime<Utc>,
    ) -> AnnalResult<ArchiveOutcome> {
        let cutoff = period.cutoff(now);
        let cutoff_str = cutoff.to_string();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let archived: i64 = tx.query_row(
            &format!("SELECT COUNT(*) FROM {LIVE_TABLE} WHERE history_date < ?1"),
            params![cutoff_str],
            |row| row.get(0),
        )?;

        tx.execute(
            &format!(
                "INSERT INTO {ARCHIVE_TABLE} ({COLUMNS})
                 SELECT {COLUMNS} FROM {LIVE_TABLE} WHERE history_date < ?1"
            ),
            params![cutoff_str],
        )?;

        tx.execute(
            &format!("DELETE FROM {LIVE_TABLE} WHERE history_date < ?1"),
            params![cutoff_str],
        )?;

        tx.commit()?;

        info!(archived, cutoff = %cutoff, "archived old historical records");

        Ok(ArchiveOutcome {
            archived: archived as u64,
            cutoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryType;
    use crate::snapshot::Snapshot;
    use chrono::Duration;

    fn snapshot() -> Snapshot {
        [("title", Some("broken build".to_string()))]
            .into_iter()
            .collect()
    }

    fn record_aged(store: &HistoryStore, object_id: &str, days_old: i64) {
        store
            .record(
                "ticket",
                object_id,
                HistoryType::Update,
                &["title".to_string()],
                &snapshot(),
                Some(Utc::now() - Duration::days(days_old)),
            )
            .unwrap();
    }

    #[test]
    fn test_resolve_neither_parameter() {
        assert_eq!(RetentionPeriod::resolve(None, None), None);
    }

    #[test]
    fn test_resolve_zero_counts_as_missing() {
        assert_eq!(RetentionPeriod::resolve(Some(0), None), None);
        assert_eq!(
            RetentionPeriod::resolve(Some(0), Some(2)),
            Some(RetentionPeriod::Weeks(2))
        );
    }

    #[test]
    fn test_resolve_weeks_wins_over_days() {
        assert_eq!(
            RetentionPeriod::resolve(Some(10), Some(1)),
            Some(RetentionPeriod::Weeks(1))
        );
    }

    #[test]
    fn test_cutoff_uses_date_portion_only() {
        let now = DateTime::parse_from_rfc3339("2024-06-15T13:45:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let cutoff = RetentionPeriod::Days(30).cutoff(now);
        assert_eq!(cutoff.to_string(), "2024-05-16");
    }

    #[test]
    fn test_archive_moves_only_rows_older_than_cutoff() {
        let store = HistoryStore::in_memory().unwrap();
        record_aged(&store, "old", 31);
        record_aged(&store, "young", 29);

        let outcome = store
            .archive_older_than(RetentionPeriod::Days(30), Utc::now())
            .unwrap();

        assert_eq!(outcome.archived, 1);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.count_archived().unwrap(), 1);

        // The young row stays live; the old one is gone from the source.
        assert_eq!(store.for_object("ticket", "young").unwrap().len(), 1);
        assert!(store.for_object("ticket", "old").unwrap().is_empty());
    }

    #[test]
    fn test_archived_row_carries_identical_columns() {
        let store = HistoryStore::in_memory().unwrap();
        record_aged(&store, "old", 40);
        let live = store.for_object("ticket", "old").unwrap().remove(0);

        store
            .archive_older_than(RetentionPeriod::Days(30), Utc::now())
            .unwrap();

        let conn = store.lock().unwrap();
        let (id, model, history_type, data): (String, String, String, String) = conn
            .query_row(
                "SELECT id, model, history_type, data FROM archived_historical_records",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();

        assert_eq!(id, live.id);
        assert_eq!(model, "ticket");
        assert_eq!(history_type, "UPDATE");
        let parsed: Snapshot = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed, live.data);
    }

    #[test]
    fn test_weeks_cutoff_archives_accordingly() {
        let store = HistoryStore::in_memory().unwrap();
        record_aged(&store, "eight-days", 8);
        record_aged(&store, "six-days", 6);

        let outcome = store
            .archive_older_than(RetentionPeriod::Weeks(1), Utc::now())
            .unwrap();

        assert_eq!(outcome.archived, 1);
        assert_eq!(store.for_object("ticket", "six-days").unwrap().len(), 1);
    }

    #[test]
    fn test_row_on_cutoff_date_is_not_archived() {
        let store = HistoryStore::in_memory().unwrap();
        let now = Utc::now();
        // Recorded exactly 30 days ago: lands on the cutoff date itself.
        store
            .record(
                "ticket",
                "boundary",
                HistoryType::Update,
                &[],
                &snapshot(),
                Some(now - Duration::days(30)),
            )
            .unwrap();

        let outcome = store
            .archive_older_than(RetentionPeriod::Days(30), now)
            .unwrap();

        assert_eq!(outcome.archived, 0);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.count_archived().unwrap(), 0);
    }

    #[test]
    fn test_archive_failure_rolls_back_completely() {
        let store = HistoryStore::in_memory().unwrap();
        record_aged(&store, "old", 40);

        // Pre-seed the archive table with the same primary key so the
        // insert-from-select hits a constraint violation.
        {
            let live = store.for_object("ticket", "old").unwrap().remove(0);
            let conn = store.lock().unwrap();
            conn.execute(
                "INSERT INTO archived_historical_records
                 (id, model, object_id, history_type, history_diff, data, history_date)
                 VALUES (?1, 'ticket', 'old', 'UPDATE', '[]', '{}', ?2)",
                params![live.id, live.history_date.to_rfc3339()],
            )
            .unwrap();
        }

        let result = store.archive_older_than(RetentionPeriod::Days(30), Utc::now());
        assert!(result.is_err());

        // Rollback: the live row is still in place, the archive unchanged.
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.count_archived().unwrap(), 1);
    }
}
