//! Forward-only schema migrations. Each step is keyed by a monotonically
//! increasing version; the highest applied version is persisted in the
//! `migrations` table and steps at or below it are skipped on later runs.

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use super::{encode_ts, StoreError};

pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: fn(&rusqlite::Transaction<'_>) -> rusqlite::Result<()>,
}

fn all() -> [Migration; 3] {
    [
        Migration {
            version: 1,
            description: "Create activity logs table",
            up: |tx| {
                tx.execute_batch(
                    "
                    CREATE TABLE IF NOT EXISTS activity_logs (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        recorded_at TEXT NOT NULL
                    );
                    CREATE UNIQUE INDEX IF NOT EXISTS idx_activity_logs_minute
                        ON activity_logs(recorded_at);
                    ",
                )
            },
        },
        Migration {
            version: 2,
            description: "Add user status and attribute modifier tables",
            up: |tx| {
                tx.execute_batch(
                    "
                    CREATE TABLE IF NOT EXISTS user_status (
                        user_id TEXT PRIMARY KEY,
                        level INTEGER NOT NULL DEFAULT 1,
                        experience INTEGER NOT NULL DEFAULT 0,
                        total_exp INTEGER NOT NULL DEFAULT 0,
                        focus INTEGER NOT NULL DEFAULT 50,
                        productivity INTEGER NOT NULL DEFAULT 50,
                        creativity INTEGER NOT NULL DEFAULT 50,
                        stamina INTEGER NOT NULL DEFAULT 100,
                        knowledge INTEGER NOT NULL DEFAULT 10,
                        collaboration INTEGER NOT NULL DEFAULT 30,
                        updated_at TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE TABLE IF NOT EXISTS attribute_modifiers (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        user_id TEXT NOT NULL,
                        attribute TEXT NOT NULL,
                        value INTEGER NOT NULL,
                        reason TEXT NOT NULL,
                        expires_at TEXT,
                        created_at TEXT NOT NULL,
                        FOREIGN KEY (user_id) REFERENCES user_status(user_id)
                    );
                    CREATE INDEX IF NOT EXISTS idx_modifiers_user_expires
                        ON attribute_modifiers(user_id, expires_at);
                    ",
                )
            },
        },
        Migration {
            version: 3,
            description: "Add app category column to activity logs",
            up: |tx| {
                tx.execute_batch(
                    "
                    ALTER TABLE activity_logs ADD COLUMN app_category TEXT;
                    CREATE INDEX IF NOT EXISTS idx_activity_logs_category
                        ON activity_logs(recorded_at, app_category);
                    ",
                )
            },
        },
    ]
}

pub fn run(conn: &mut Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            description TEXT,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))?;
    let current = current.unwrap_or(0);

    for migration in all() {
        if migration.version <= current {
            continue;
        }
        info!(
            "running migration {}: {}",
            migration.version, migration.description
        );
        let tx = conn.transaction()?;
        (migration.up)(&tx)?;
        tx.execute(
            "INSERT INTO migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                encode_ts(Utc::now())
            ],
        )?;
        tx.commit()?;
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<i64, StoreError> {
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{current_version, run};

    #[test]
    fn applies_all_migrations_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 3);

        // A second run must be a no-op, not a duplicate-apply error.
        run(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 3);

        let ledger: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(ledger, 3);
    }
}
