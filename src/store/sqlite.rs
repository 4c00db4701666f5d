//! SQLite-backed store

use super::traits::*;
use crate::driver::Cookie;
use crate::policy::{ActionKind, Quota};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS connections (
    id BLOB PRIMARY KEY,
    target_id TEXT NOT NULL UNIQUE,
    profile_url TEXT NOT NULL,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    job_title TEXT NOT NULL DEFAULT '',
    company TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    note TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    accepted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_connections_status ON connections(status);

CREATE TABLE IF NOT EXISTS messages (
    id BLOB PRIMARY KEY,
    connection_id BLOB NOT NULL,
    content TEXT NOT NULL,
    template_index INTEGER NOT NULL,
    status TEXT NOT NULL,
    sent_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_connection ON messages(connection_id);

CREATE TABLE IF NOT EXISTS daily_activity (
    date TEXT PRIMARY KEY,
    connections INTEGER NOT NULL DEFAULT 0,
    messages INTEGER NOT NULL DEFAULT 0,
    last_connection_at TEXT,
    last_message_at TEXT
);

CREATE TABLE IF NOT EXISTS session_cookies (
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    domain TEXT NOT NULL,
    path TEXT NOT NULL,
    expires TEXT,
    http_only INTEGER NOT NULL,
    secure INTEGER NOT NULL,
    PRIMARY KEY (name, domain, path)
);

CREATE TABLE IF NOT EXISTS session_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    saved_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS processed_targets (
    target_id TEXT PRIMARY KEY,
    processed_at TEXT DEFAULT CURRENT_TIMESTAMP
);
";

const CONNECTION_COLUMNS: &str = "id, target_id, profile_url, first_name, last_name, job_title, \
     company, location, note, status, created_at, accepted_at";

#[derive(Debug)]
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = Connection::open(path)
            .map_err(|e| Error::persistence(format!("failed to open {}: {}", path.display(), e)))?;
        db.pragma_update(None, "journal_mode", "WAL")?;
        info!("Opened store at {}", path.display());
        Self::init(db)
    }

    /// Private database that vanishes with the store
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> Result<Self> {
        db.execute_batch(SCHEMA)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_text<T: FromStr<Err = Error>>(idx: usize, raw: String) -> rusqlite::Result<T> {
    raw.parse()
        .map_err(|e: Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<ConnectionRecord> {
    Ok(ConnectionRecord {
        id: row.get(0)?,
        target_id: row.get(1)?,
        profile_url: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        job_title: row.get(5)?,
        company: row.get(6)?,
        location: row.get(7)?,
        note: row.get(8)?,
        status: parse_text(9, row.get(9)?)?,
        created_at: row.get(10)?,
        accepted_at: row.get(11)?,
    })
}

fn quota_from_row(row: &Row<'_>) -> rusqlite::Result<Quota> {
    Ok(Quota {
        date: row.get(0)?,
        connections: row.get(1)?,
        messages: row.get(2)?,
        last_connection_at: row.get(3)?,
        last_message_at: row.get(4)?,
    })
}

fn select_quota(db: &Connection, date: NaiveDate) -> rusqlite::Result<Quota> {
    Ok(db
        .query_row(
            "SELECT date, connections, messages, last_connection_at, last_message_at
             FROM daily_activity WHERE date = ?1",
            params![date],
            quota_from_row,
        )
        .optional()?
        .unwrap_or_else(|| Quota::new(date)))
}

impl Store for SqliteStore {
    fn upsert_connection(&self, r: &ConnectionRecord) -> Result<()> {
        self.db().execute(
            &format!(
                "INSERT INTO connections ({CONNECTION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(target_id) DO UPDATE SET
                    profile_url = excluded.profile_url,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    job_title = excluded.job_title,
                    company = excluded.company,
                    location = excluded.location,
                    note = excluded.note,
                    status = excluded.status"
            ),
            params![
                r.id,
                r.target_id,
                r.profile_url,
                r.first_name,
                r.last_name,
                r.job_title,
                r.company,
                r.location,
                r.note,
                r.status.as_str(),
                r.created_at,
                r.accepted_at,
            ],
        )?;
        Ok(())
    }

    fn update_connection_status(
        &self,
        target_id: &str,
        status: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let rows = if status == ConnectionStatus::Accepted {
            self.db().execute(
                "UPDATE connections SET status = ?2, accepted_at = ?3 WHERE target_id = ?1",
                params![target_id, status.as_str(), at],
            )?
        } else {
            self.db().execute(
                "UPDATE connections SET status = ?2 WHERE target_id = ?1",
                params![target_id, status.as_str()],
            )?
        };
        Ok(rows > 0)
    }

    fn get_connection(&self, target_id: &str) -> Result<Option<ConnectionRecord>> {
        Ok(self
            .db()
            .query_row(
                &format!("SELECT {CONNECTION_COLUMNS} FROM connections WHERE target_id = ?1"),
                params![target_id],
                connection_from_row,
            )
            .optional()?)
    }

    fn list_connections(&self, status: Option<ConnectionStatus>) -> Result<Vec<ConnectionRecord>> {
        let db = self.db();
        let mut stmt = db.prepare(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections
             WHERE ?1 IS NULL OR status = ?1
             ORDER BY created_at, target_id"
        ))?;
        let list = stmt
            .query_map(params![status.map(|s| s.as_str())], connection_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(list)
    }

    fn record_message(&self, m: &MessageRecord) -> Result<()> {
        self.db().execute(
            "INSERT INTO messages (id, connection_id, content, template_index, status, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                m.id,
                m.connection_id,
                m.content,
                m.template_index as i64,
                m.status.as_str(),
                m.sent_at,
            ],
        )?;
        Ok(())
    }

    fn has_message_for(&self, connection_id: Uuid) -> Result<bool> {
        let exists: bool = self.db().query_row(
            "SELECT EXISTS(SELECT 1 FROM messages WHERE connection_id = ?1)",
            params![connection_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn daily_counters(&self, date: NaiveDate) -> Result<Quota> {
        Ok(select_quota(&self.db(), date)?)
    }

    fn increment_counter(&self, date: NaiveDate, kind: ActionKind, at: NaiveDateTime) -> Result<Quota> {
        let mut db = self.db();
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO daily_activity (date) VALUES (?1) ON CONFLICT(date) DO NOTHING",
            params![date],
        )?;
        let update = match kind {
            ActionKind::Connection => {
                "UPDATE daily_activity SET connections = connections + 1, last_connection_at = ?2
                 WHERE date = ?1"
            }
            ActionKind::Message => {
                "UPDATE daily_activity SET messages = messages + 1, last_message_at = ?2
                 WHERE date = ?1"
            }
        };
        tx.execute(update, params![date, at])?;
        let quota = select_quota(&tx, date)?;
        tx.commit()?;
        Ok(quota)
    }

    fn is_target_processed(&self, target_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .db()
            .query_row(
                "SELECT 1 FROM processed_targets WHERE target_id = ?1",
                params![target_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn mark_target_processed(&self, target_id: &str) -> Result<()> {
        self.db().execute(
            "INSERT OR IGNORE INTO processed_targets (target_id) VALUES (?1)",
            params![target_id],
        )?;
        Ok(())
    }

    fn save_session(&self, session: &SessionRecord) -> Result<()> {
        let mut db = self.db();
        let tx = db.transaction()?;
        tx.execute("DELETE FROM session_cookies", [])?;
        for c in &session.cookies {
            tx.execute(
                "INSERT OR REPLACE INTO session_cookies
                    (name, value, domain, path, expires, http_only, secure)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![c.name, c.value, c.domain, c.path, c.expires, c.http_only, c.secure],
            )?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO session_meta (id, saved_at) VALUES (1, ?1)",
            params![session.saved_at],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load_session(&self) -> Result<Option<SessionRecord>> {
        let db = self.db();
        let saved_at: Option<DateTime<Utc>> = db
            .query_row("SELECT saved_at FROM session_meta WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        let Some(saved_at) = saved_at else {
            return Ok(None);
        };

        let mut stmt = db.prepare(
            "SELECT name, value, domain, path, expires, http_only, secure
             FROM session_cookies ORDER BY name",
        )?;
        let cookies = stmt
            .query_map([], |row| {
                Ok(Cookie {
                    name: row.get(0)?,
                    value: row.get(1)?,
                    domain: row.get(2)?,
                    path: row.get(3)?,
                    expires: row.get(4)?,
                    http_only: row.get(5)?,
                    secure: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(SessionRecord { cookies, saved_at }))
    }

    fn clear_session(&self) -> Result<()> {
        let mut db = self.db();
        let tx = db.transaction()?;
        tx.execute("DELETE FROM session_cookies", [])?;
        tx.execute("DELETE FROM session_meta", [])?;
        tx.commit()?;
        Ok(())
    }
}
