//! SQLite persistence. The whole store runs over a single serialized
//! connection guarded by one async mutex, which is the only synchronization
//! point in the process. Individual stores ([activity::ActivityStore],
//! [status::StatusStore]) borrow that connection per operation and never add
//! locking of their own.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

pub mod activity;
pub mod entities;
pub mod migrations;
pub mod status;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("timestamp parse error: {0}")]
    Timestamp(String),
    #[error("unknown attribute name: {0}")]
    Attribute(String),
}

/// Owner of the serialized database session. Opening runs all pending
/// migrations, so a handed-out `Database` always has the latest schema.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut conn = Connection::open(path)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) async fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

/// Timestamps are stored as whole-second UTC RFC 3339 text
/// (`2024-03-15T12:05:00Z`), which sorts lexicographically in chronological
/// order so SQL range comparisons stay correct.
pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn decode_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| StoreError::Timestamp(format!("{raw}: {e}")))
}
