//! SQLite-based session storage: one row per session, one column per phase.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

use super::data_dir;
use super::record::{SessionRecord, SessionStore};
use crate::error::{DatabaseError, Result};
use crate::timer::MAX_PHASES;

const SESSION_COLUMNS: &str =
    "id, started_at, phase_count, record1_seconds, record2_seconds, record3_seconds, ended_at";

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/breathroom.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened
    /// or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("breathroom.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "session database opened");
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS sessions (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    started_at      TEXT NOT NULL,
                    phase_count     INTEGER NOT NULL DEFAULT 2,
                    record1_seconds REAL,
                    record2_seconds REAL,
                    record3_seconds REAL,
                    ended_at        TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    fn select(&self, sql_tail: &str, args: impl rusqlite::Params) -> Result<Vec<SessionRecord>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions {sql_tail}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args, read_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }
}

impl SessionStore for Database {
    fn insert(&mut self, record: &SessionRecord) -> Result<i64> {
        record.validate()?;
        let [r1, r2, r3] = phase_columns(record);
        self.conn.execute(
            "INSERT INTO sessions (started_at, phase_count, record1_seconds, record2_seconds, record3_seconds, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                timestamp(&record.started_at),
                record.phase_count as i64,
                r1,
                r2,
                r3,
                record.ended_at.as_ref().map(timestamp),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, phases = record.phase_seconds.len(), "session recorded");
        Ok(id)
    }

    fn update(&mut self, record: &SessionRecord) -> Result<()> {
        record.validate()?;
        let stored = self.get(record.id)?.ok_or(DatabaseError::NotFound(record.id))?;
        stored.check_update(record)?;
        let [r1, r2, r3] = phase_columns(record);
        let changed = self.conn.execute(
            "UPDATE sessions
             SET record1_seconds = ?2, record2_seconds = ?3, record3_seconds = ?4, ended_at = ?5
             WHERE id = ?1",
            params![
                record.id,
                r1,
                r2,
                r3,
                record.ended_at.as_ref().map(timestamp),
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(record.id).into());
        }
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<SessionRecord>> {
        Ok(self.select("WHERE id = ?1", params![id])?.into_iter().next())
    }

    fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<SessionRecord>> {
        self.select(
            "WHERE started_at >= ?1 AND started_at < ?2 ORDER BY started_at DESC, id DESC",
            params![timestamp(&from), timestamp(&to)],
        )
    }

    fn recent(&self, limit: Option<usize>) -> Result<Vec<SessionRecord>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        self.select(
            "ORDER BY started_at DESC, id DESC LIMIT ?1",
            params![limit],
        )
    }

    fn delete(&mut self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if changed > 0 {
            tracing::info!(id, "session deleted");
        }
        Ok(changed > 0)
    }
}

/// Fixed-width UTC text so lexical order is chronological order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: i64, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            id,
            message: format!("bad timestamp {raw:?}: {e}"),
        })
}

fn phase_columns(record: &SessionRecord) -> [Option<f64>; MAX_PHASES] {
    let mut cols = [None; MAX_PHASES];
    for (slot, secs) in cols.iter_mut().zip(&record.phase_seconds) {
        *slot = Some(*secs);
    }
    cols
}

type RowResult = Result<SessionRecord, DatabaseError>;

fn read_row(row: &Row<'_>) -> rusqlite::Result<RowResult> {
    let id: i64 = row.get(0)?;
    let started_at: String = row.get(1)?;
    let phase_count: i64 = row.get(2)?;
    let columns: [Option<f64>; MAX_PHASES] = [row.get(3)?, row.get(4)?, row.get(5)?];
    let ended_at: Option<String> = row.get(6)?;
    Ok(decode_row(id, &started_at, phase_count, columns, ended_at.as_deref()))
}

fn decode_row(
    id: i64,
    started_at: &str,
    phase_count: i64,
    columns: [Option<f64>; MAX_PHASES],
    ended_at: Option<&str>,
) -> RowResult {
    let ended_at = match ended_at {
        Some(raw) => Some(parse_timestamp(id, raw)?),
        None => None,
    };
    Ok(SessionRecord {
        id,
        started_at: parse_timestamp(id, started_at)?,
        phase_count: phase_count.max(0) as usize,
        phase_seconds: columns.iter().map_while(|c| *c).collect(),
        ended_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    fn completed(start: DateTime<Utc>, secs: &[f64]) -> SessionRecord {
        SessionRecord {
            id: 0,
            started_at: start,
            phase_count: secs.len(),
            phase_seconds: secs.to_vec(),
            ended_at: Some(start + chrono::Duration::seconds(60)),
        }
    }

    #[test]
    fn record_and_query() {
        let mut db = Database::open_memory().unwrap();
        let id = db.insert(&completed(at(7, 0), &[12.37, 8.02])).unwrap();
        let stored = db.get(id).unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.phase_seconds, vec![12.37, 8.02]);
        assert_eq!(stored.started_at, at(7, 0));
        assert!(stored.is_complete());
    }

    #[test]
    fn range_query_is_half_open_and_descending() {
        let mut db = Database::open_memory().unwrap();
        db.insert(&completed(at(6, 0), &[1.0, 2.0])).unwrap();
        db.insert(&completed(at(7, 0), &[3.0, 4.0])).unwrap();
        db.insert(&completed(at(8, 0), &[5.0, 6.0, 7.0])).unwrap();

        let found = db.in_range(at(6, 30), at(8, 0)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].started_at, at(7, 0));

        let all = db.in_range(at(0, 0), at(23, 0)).unwrap();
        let starts: Vec<_> = all.iter().map(|r| r.started_at).collect();
        assert_eq!(starts, vec![at(8, 0), at(7, 0), at(6, 0)]);
        assert_eq!(all[0].phase_seconds.len(), 3);
    }

    #[test]
    fn recent_respects_limit() {
        let mut db = Database::open_memory().unwrap();
        for h in 1..=4 {
            db.insert(&completed(at(h, 0), &[1.0, 1.0])).unwrap();
        }
        assert_eq!(db.recent(None).unwrap().len(), 4);
        let two = db.recent(Some(2)).unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].started_at, at(4, 0));
    }

    #[test]
    fn early_insert_then_update_in_place() {
        let mut db = Database::open_memory().unwrap();
        let mut record = SessionRecord::begin(at(9, 0), 2);
        record.id = db.insert(&record).unwrap();
        record.record_phase(4.5, at(9, 0)).unwrap();
        db.update(&record).unwrap();
        record.record_phase(6.0, at(9, 1)).unwrap();
        db.update(&record).unwrap();

        let stored = db.get(record.id).unwrap().unwrap();
        assert_eq!(stored.phase_seconds, vec![4.5, 6.0]);
        assert_eq!(stored.ended_at, Some(at(9, 1)));
    }

    #[test]
    fn invalid_records_are_not_written() {
        let mut db = Database::open_memory().unwrap();
        let mut record = completed(at(7, 0), &[1.0, 2.0]);
        record.ended_at = None;
        assert!(db.insert(&record).is_err());
        assert!(db.recent(None).unwrap().is_empty());
    }

    #[test]
    fn delete_by_identity() {
        let mut db = Database::open_memory().unwrap();
        let keep = db.insert(&completed(at(6, 0), &[1.0, 2.0])).unwrap();
        let gone = db.insert(&completed(at(7, 0), &[1.0, 2.0])).unwrap();
        assert!(db.delete(gone).unwrap());
        assert!(!db.delete(gone).unwrap());
        let left: Vec<_> = db.recent(None).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(left, vec![keep]);
    }

    #[test]
    fn update_of_missing_row_fails() {
        let mut db = Database::open_memory().unwrap();
        let mut record = completed(at(7, 0), &[1.0, 2.0]);
        record.id = 42;
        assert!(db.update(&record).is_err());
    }

    #[test]
    fn finished_rows_cannot_be_rewritten() {
        let mut db = Database::open_memory().unwrap();
        let id = db.insert(&completed(at(7, 0), &[12.37, 8.02])).unwrap();
        let mut rewrite = completed(at(7, 0), &[99.0, 1.0]);
        rewrite.id = id;
        assert!(matches!(
            db.update(&rewrite),
            Err(CoreError::Validation(ValidationError::AlreadyEnded(_)))
        ));
        assert_eq!(db.get(id).unwrap().unwrap().phase_seconds, vec![12.37, 8.02]);
    }

    #[test]
    fn recorded_durations_are_set_once() {
        let mut db = Database::open_memory().unwrap();
        let mut record = SessionRecord::begin(at(9, 0), 3);
        record.id = db.insert(&record).unwrap();
        record.record_phase(4.5, at(9, 0)).unwrap();
        db.update(&record).unwrap();

        let mut rewrite = record.clone();
        rewrite.phase_seconds = vec![1.0, 2.0];
        assert!(matches!(
            db.update(&rewrite),
            Err(CoreError::Validation(ValidationError::DurationRewritten { index: 0, .. }))
        ));
        assert_eq!(db.get(record.id).unwrap().unwrap().phase_seconds, vec![4.5]);
    }
}
