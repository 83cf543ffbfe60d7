use std::path::PathBuf;

use rusqlite::{params, Connection};

use crate::error::{AppError, AppResult};
use crate::history::models::LaunchRecord;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS launches (
    run_id TEXT PRIMARY KEY,
    worker TEXT,
    range_start TEXT NOT NULL,
    range_end TEXT NOT NULL,
    model TEXT NOT NULL,
    compute_type TEXT NOT NULL,
    force INTEGER NOT NULL,
    exit_code INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    elapsed_seconds REAL NOT NULL
);";

pub struct HistoryStore {
    db_path: PathBuf,
}

impl HistoryStore {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    pub fn record(&self, record: &LaunchRecord) -> AppResult<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let connection = Connection::open(&self.db_path)?;
        connection.execute_batch(SCHEMA)?;
        connection.execute(
            "INSERT INTO launches (run_id, worker, range_start, range_end, model, compute_type,
                                   force, exit_code, started_at, finished_at, elapsed_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.run_id,
                record.worker,
                record.range_start,
                record.range_end,
                record.model,
                record.compute_type,
                record.force,
                record.exit_code,
                record.started_at_rfc3339,
                record.finished_at_rfc3339,
                record.elapsed_seconds,
            ],
        )?;
        Ok(())
    }

    pub fn list_recent(&self, limit: usize) -> AppResult<Vec<LaunchRecord>> {
        if !self.db_path.exists() {
            return Ok(Vec::new());
        }

        let connection = Connection::open(&self.db_path)?;
        let limit = if limit == 0 { i64::MAX } else { limit as i64 };
        let sql = "SELECT run_id, worker, range_start, range_end, model, compute_type, force, \
                   exit_code, started_at, finished_at, elapsed_seconds \
                   FROM launches ORDER BY started_at DESC, rowid DESC LIMIT ?1";

        let mut statement = match connection.prepare(sql) {
            Ok(statement) => statement,
            Err(error) => return handle_missing_schema(error),
        };

        let rows = statement.query_map([limit], |row| {
            Ok(LaunchRecord {
                run_id: row.get(0)?,
                worker: row.get(1)?,
                range_start: row.get(2)?,
                range_end: row.get(3)?,
                model: row.get(4)?,
                compute_type: row.get(5)?,
                force: row.get(6)?,
                exit_code: row.get(7)?,
                started_at_rfc3339: row.get(8)?,
                finished_at_rfc3339: row.get(9)?,
                elapsed_seconds: row.get(10)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn latest(&self) -> AppResult<Option<LaunchRecord>> {
        let mut records = self.list_recent(1)?;
        Ok(records.pop())
    }
}

fn handle_missing_schema(error: rusqlite::Error) -> AppResult<Vec<LaunchRecord>> {
    match &error {
        rusqlite::Error::SqliteFailure(_, Some(message))
            if message.contains("no such table") || message.contains("no such column") =>
        {
            Ok(Vec::new())
        }
        _ => Err(AppError::Sqlite(error)),
    }
}

pub fn render_history(records: &[LaunchRecord]) -> String {
    if records.is_empty() {
        return "No launches recorded.\n".to_owned();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{:<20} {:<10} {:<13} {:<16} {:<5} {:<4} {}\n",
        "STARTED", "WORKER", "RANGE", "MODEL", "FORCE", "EXIT", "RUN"
    ));
    for record in records {
        out.push_str(&format!(
            "{:<20} {:<10} {:<13} {:<16} {:<5} {:<4} {}\n",
            record.started_at_rfc3339,
            record.worker.as_deref().unwrap_or("-"),
            format!("{}-{}", record.range_start, record.range_end),
            format!("{}/{}", record.model, record.compute_type),
            if record.force { "yes" } else { "no" },
            record.exit_code,
            record.run_id
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{render_history, HistoryStore};
    use crate::history::models::LaunchRecord;
    use rusqlite::Connection;

    fn record(run_id: &str, started_at: &str, exit_code: i32) -> LaunchRecord {
        LaunchRecord {
            run_id: run_id.to_owned(),
            worker: Some("studio".to_owned()),
            range_start: "E0501".to_owned(),
            range_end: "E1650".to_owned(),
            model: "base".to_owned(),
            compute_type: "int8".to_owned(),
            force: false,
            exit_code,
            started_at_rfc3339: started_at.to_owned(),
            finished_at_rfc3339: started_at.to_owned(),
            elapsed_seconds: 12.5,
        }
    }

    #[test]
    fn returns_empty_when_db_missing() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let store = HistoryStore::new(temp.path().join("missing.sqlite3"));
        assert!(store.list_recent(10).expect("list").is_empty());
        assert!(store.latest().expect("latest").is_none());
    }

    #[test]
    fn handles_missing_schema_gracefully() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let db = temp.path().join("history.sqlite3");
        let _ = Connection::open(&db).expect("create db");
        let store = HistoryStore::new(db);
        assert!(store.list_recent(10).expect("list").is_empty());
    }

    #[test]
    fn record_then_list_newest_first() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let store = HistoryStore::new(temp.path().join("nested/history.sqlite3"));
        store
            .record(&record("old", "2026-10-01T00:00:00Z", 0))
            .expect("record old");
        store
            .record(&record("new", "2026-10-02T00:00:00Z", 3))
            .expect("record new");

        let all = store.list_recent(0).expect("list all");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].run_id, "new");
        assert_eq!(all[0].exit_code, 3);
        assert_eq!(all[1], record("old", "2026-10-01T00:00:00Z", 0));

        let latest = store.latest().expect("latest").expect("some");
        assert_eq!(latest.run_id, "new");
        assert_eq!(store.list_recent(1).expect("one").len(), 1);
    }

    #[test]
    fn duplicate_run_id_is_rejected() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let store = HistoryStore::new(temp.path().join("history.sqlite3"));
        store
            .record(&record("same", "2026-10-01T00:00:00Z", 0))
            .expect("first");
        assert!(store
            .record(&record("same", "2026-10-01T00:00:00Z", 0))
            .is_err());
    }

    #[test]
    fn render_lists_rows_or_placeholder() {
        assert_eq!(render_history(&[]), "No launches recorded.\n");
        let text = render_history(&[record("run-1", "2026-10-01T00:00:00Z", 2)]);
        assert!(text.contains("E0501-E1650"));
        assert!(text.contains("base/int8"));
        assert!(text.contains("run-1"));
    }
}
