use super::EntityStore;
use crate::app_dirs::AppDirs;
use crate::error::StoreError;
use crate::model::{Commute, CommuteId, Mode, Session, SessionId};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS commutes (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        mode TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        commute_id TEXT NOT NULL REFERENCES commutes(id) ON DELETE CASCADE,
        date TEXT NOT NULL,
        duration_secs REAL NOT NULL,
        mode TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_commute ON sessions(commute_id);
    CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);
"#;

/// SQLite-backed store. Every mutation is a single short statement or transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Persistence(format!("failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(&path)?;
        Self::init(conn, path)
    }

    /// Open the database at the default location under the user's state directory
    pub fn open_default() -> Result<Self, StoreError> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("commute_pro.db"));
        Self::open(path)
    }

    /// In-memory database, gone when dropped
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("opened commute database at {}", path.display());
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commute_exists(&self, id: CommuteId) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM commutes WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn encode_date(date: &DateTime<Local>) -> String {
    date.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Local))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decode_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn commute_from_row(row: &Row<'_>) -> rusqlite::Result<Commute> {
    Ok(Commute {
        id: CommuteId::from(decode_uuid(row, 0)?),
        name: row.get(1)?,
        mode: Mode::new(row.get::<_, String>(2)?),
        created_at: decode_date(row, 3)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: SessionId::from(decode_uuid(row, 0)?),
        commute_id: CommuteId::from(decode_uuid(row, 1)?),
        date: decode_date(row, 2)?,
        duration_secs: row.get(3)?,
        mode: Mode::new(row.get::<_, String>(4)?),
    })
}

impl EntityStore for SqliteStore {
    fn insert_commute(&mut self, commute: &Commute) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO commutes (id, name, mode, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                commute.id.to_string(),
                commute.name,
                commute.mode.as_str(),
                encode_date(&commute.created_at),
            ],
        )?;
        Ok(())
    }

    fn commute(&self, id: CommuteId) -> Result<Commute, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, mode, created_at FROM commutes WHERE id = ?1",
                [id.to_string()],
                commute_from_row,
            )
            .optional()?
            .ok_or(StoreError::CommuteNotFound(id))
    }

    fn commutes(&self) -> Result<Vec<Commute>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, mode, created_at FROM commutes ORDER BY name COLLATE NOCASE, id",
        )?;
        let rows = stmt.query_map([], commute_from_row)?;

        let mut commutes = Vec::new();
        for commute in rows {
            commutes.push(commute?);
        }
        Ok(commutes)
    }

    fn delete_commute(&mut self, id: CommuteId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM sessions WHERE commute_id = ?1",
            [id.to_string()],
        )?;
        let removed = tx.execute("DELETE FROM commutes WHERE id = ?1", [id.to_string()])?;
        if removed == 0 {
            return Err(StoreError::CommuteNotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    fn add_session(&mut self, session: &Session) -> Result<(), StoreError> {
        if !self.commute_exists(session.commute_id)? {
            return Err(StoreError::CommuteNotFound(session.commute_id));
        }
        self.conn.execute(
            r#"
            INSERT INTO sessions (id, commute_id, date, duration_secs, mode)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                session.id.to_string(),
                session.commute_id.to_string(),
                encode_date(&session.date),
                session.duration_secs,
                session.mode.as_str(),
            ],
        )?;
        Ok(())
    }

    fn delete_session(&mut self, id: SessionId) -> Result<(), StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", [id.to_string()])?;
        if removed == 0 {
            return Err(StoreError::SessionNotFound(id));
        }
        Ok(())
    }

    fn sessions_for(&self, commute_id: CommuteId) -> Result<Vec<Session>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, commute_id, date, duration_secs, mode
            FROM sessions
            WHERE commute_id = ?1
            ORDER BY date DESC, id
            "#,
        )?;
        let rows = stmt.query_map([commute_id.to_string()], session_from_row)?;

        let mut sessions = Vec::new();
        for session in rows {
            sessions.push(session?);
        }
        Ok(sessions)
    }

    fn clear_sessions(&mut self, commute_id: CommuteId) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM sessions WHERE commute_id = ?1",
            [commute_id.to_string()],
        )?;
        tx.commit()?;
        Ok(removed)
    }
}
