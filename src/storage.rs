//! Local persistence. Two stores, both under the app state dir:
//!
//! - the active session as pretty JSON, written after every mutation and
//!   removed when the session finishes;
//! - finished-session summaries in a small sqlite history database, with
//!   JSON import (dedupe by id, newest wins) and CSV export.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::app_dirs::AppDirs;
use crate::progression::FlowState;
use crate::rest_timer::RestTimer;
use crate::session::{Session, SessionSummary};

/// Everything needed to pick a session back up after a reload: the flat
/// exercise collection plus the workflow cursors and rest-timer state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub session: Session,
    pub flow: FlowState,
    pub rest: RestTimer,
    pub updated_at: DateTime<Utc>,
}

pub trait SessionStore {
    /// None when there is no resumable session (or it fails to parse).
    fn load(&self) -> Option<PersistedSession>;
    fn save(&self, state: &PersistedSession) -> io::Result<()>;
    /// Drop the active-session snapshot (called when a session finishes).
    fn clear(&self) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new() -> Self {
        let path = AppDirs::session_path().unwrap_or_else(|| PathBuf::from("replog_session.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<PersistedSession> {
        let bytes = fs::read(&self.path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn save(&self, state: &PersistedSession) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(state)?;
        fs::write(&self.path, data)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Finished-session history.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    pub fn new() -> rusqlite::Result<Self> {
        let path = AppDirs::history_db_path().unwrap_or_else(|| PathBuf::from("replog_history.db"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("failed to create state directory: {e}")),
                )
            })?;
        }
        Self::open(&path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                exercise_count INTEGER NOT NULL,
                set_count INTEGER NOT NULL,
                total_volume_kg REAL NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at)",
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn record(&self, summary: &SessionSummary) -> rusqlite::Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO sessions
            (id, started_at, duration_secs, exercise_count, set_count, total_volume_kg)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                summary.id,
                summary.started_at.to_rfc3339(),
                summary.duration_secs,
                summary.exercise_count,
                summary.set_count,
                summary.total_volume_kg,
            ],
        )?;
        Ok(())
    }

    pub fn list(&self) -> rusqlite::Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, duration_secs, exercise_count, set_count, total_volume_kg
             FROM sessions ORDER BY started_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let started: String = row.get(1)?;
            Ok(SessionSummary {
                id: row.get(0)?,
                started_at: DateTime::parse_from_rfc3339(&started)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                duration_secs: row.get(2)?,
                exercise_count: row.get::<_, i64>(3)? as usize,
                set_count: row.get::<_, i64>(4)? as usize,
                total_volume_kg: row.get(5)?,
            })
        })?;
        rows.collect()
    }

    fn started_at_of(&self, id: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT started_at FROM sessions WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(started) => Ok(DateTime::parse_from_rfc3339(&started?)
                .map(|d| Some(d.with_timezone(&Utc)))
                .unwrap_or(None)),
            None => Ok(None),
        }
    }

    /// Merge imported summaries into the history: dedupe by id, and on a
    /// collision keep whichever record started later. Returns the number of
    /// rows written.
    pub fn import(&self, imported: &[SessionSummary]) -> rusqlite::Result<usize> {
        let mut written = 0;
        for summary in imported {
            let keep_existing = matches!(
                self.started_at_of(&summary.id)?,
                Some(existing) if existing >= summary.started_at
            );
            if keep_existing {
                continue;
            }
            self.record(summary)?;
            written += 1;
        }
        Ok(written)
    }

    /// Read a JSON export (an array of summaries) and merge it in.
    pub fn import_json<P: AsRef<Path>>(&self, path: P) -> io::Result<usize> {
        let bytes = fs::read(path)?;
        let imported: Vec<SessionSummary> = serde_json::from_slice(&bytes)?;
        self.import(&imported)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    /// Write the history as CSV, newest first.
    pub fn export_csv<W: io::Write>(&self, out: W) -> io::Result<()> {
        let summaries = self
            .list()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record([
            "id",
            "started_at",
            "duration_secs",
            "exercise_count",
            "set_count",
            "total_volume_kg",
        ])?;
        for s in summaries {
            writer.write_record([
                s.id.as_str(),
                &s.started_at.to_rfc3339(),
                &s.duration_secs.to_string(),
                &s.exercise_count.to_string(),
                &s.set_count.to_string(),
                &format!("{:.1}", s.total_volume_kg),
            ])?;
        }
        writer.flush()
    }
}
