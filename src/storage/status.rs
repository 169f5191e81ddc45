use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{
    decode_ts, encode_ts,
    entities::{Attribute, AttributeModifier, NewModifier, UserStatus},
    Database, StoreError,
};

/// Durable per-user status record plus its attribute modifiers.
pub struct StatusStore {
    db: Arc<Database>,
}

impl StatusStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Returns the stored status, creating the seeded default on first
    /// access. Insert-or-ignore followed by a re-read, so a concurrent
    /// creation race never surfaces as a duplicate-key error.
    pub async fn get_or_create(&self, user_id: &str) -> Result<UserStatus, StoreError> {
        let conn = self.db.conn().await;
        let seed = UserStatus::seeded(user_id, Utc::now());
        conn.execute(
            "INSERT OR IGNORE INTO user_status (
                user_id, level, experience, total_exp,
                focus, productivity, creativity, stamina, knowledge, collaboration,
                updated_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                seed.user_id,
                seed.level,
                seed.experience,
                seed.total_exp,
                seed.focus,
                seed.productivity,
                seed.creativity,
                seed.stamina,
                seed.knowledge,
                seed.collaboration,
                encode_ts(seed.updated_at),
                encode_ts(seed.created_at),
            ],
        )?;

        let raw = conn
            .query_row(
                "SELECT user_id, level, experience, total_exp,
                        focus, productivity, creativity, stamina, knowledge, collaboration,
                        updated_at, created_at
                 FROM user_status WHERE user_id = ?1",
                params![user_id],
                status_from_row,
            )
            .optional()?;

        match raw {
            Some(status) => status,
            None => Err(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows)),
        }
    }

    /// Full upsert of attributes, level and experience. Stamps `updated_at`
    /// with the current time on the caller's copy as well.
    pub async fn save(&self, status: &mut UserStatus) -> Result<(), StoreError> {
        status.updated_at = Utc::now();
        let conn = self.db.conn().await;
        conn.execute(
            "INSERT INTO user_status (
                user_id, level, experience, total_exp,
                focus, productivity, creativity, stamina, knowledge, collaboration,
                updated_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(user_id) DO UPDATE SET
                level = excluded.level,
                experience = excluded.experience,
                total_exp = excluded.total_exp,
                focus = excluded.focus,
                productivity = excluded.productivity,
                creativity = excluded.creativity,
                stamina = excluded.stamina,
                knowledge = excluded.knowledge,
                collaboration = excluded.collaboration,
                updated_at = excluded.updated_at",
            params![
                status.user_id,
                status.level,
                status.experience,
                status.total_exp,
                status.focus,
                status.productivity,
                status.creativity,
                status.stamina,
                status.knowledge,
                status.collaboration,
                encode_ts(status.updated_at),
                encode_ts(status.created_at),
            ],
        )?;
        Ok(())
    }

    /// Modifiers still in effect at `as_of`, newest first. Expiry is filtered
    /// here at query time; [StatusStore::sweep_expired] is housekeeping only.
    pub async fn list_active_modifiers(
        &self,
        user_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AttributeModifier>, StoreError> {
        let conn = self.db.conn().await;
        let mut statement = conn.prepare(
            "SELECT id, user_id, attribute, value, reason, expires_at, created_at
             FROM attribute_modifiers
             WHERE user_id = ?1
               AND (expires_at IS NULL OR expires_at > ?2)
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = statement.query_map(params![user_id, encode_ts(as_of)], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut modifiers = Vec::new();
        for row in rows {
            let (id, user_id, attribute, value, reason, expires_at, created_at) = row?;
            modifiers.push(AttributeModifier {
                id,
                user_id,
                attribute: Attribute::from_name(&attribute)
                    .ok_or(StoreError::Attribute(attribute))?,
                value,
                reason,
                expires_at: expires_at.as_deref().map(decode_ts).transpose()?,
                created_at: decode_ts(&created_at)?,
            });
        }
        Ok(modifiers)
    }

    pub async fn create_modifier(
        &self,
        modifier: NewModifier,
    ) -> Result<AttributeModifier, StoreError> {
        let created_at = Utc::now();
        let conn = self.db.conn().await;
        conn.execute(
            "INSERT INTO attribute_modifiers (user_id, attribute, value, reason, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                modifier.user_id,
                modifier.attribute.as_str(),
                modifier.value,
                modifier.reason,
                modifier.expires_at.map(encode_ts),
                encode_ts(created_at),
            ],
        )?;
        Ok(AttributeModifier {
            id: conn.last_insert_rowid(),
            user_id: modifier.user_id,
            attribute: modifier.attribute,
            value: modifier.value,
            reason: modifier.reason,
            expires_at: modifier.expires_at,
            created_at,
        })
    }

    /// Deletes modifiers whose expiry has passed. Returns how many went.
    pub async fn sweep_expired(&self, as_of: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.db.conn().await;
        let deleted = conn.execute(
            "DELETE FROM attribute_modifiers
             WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![encode_ts(as_of)],
        )?;
        Ok(deleted)
    }
}

fn status_from_row(row: &Row<'_>) -> rusqlite::Result<Result<UserStatus, StoreError>> {
    let updated_at: String = row.get(10)?;
    let created_at: String = row.get(11)?;
    Ok((|| {
        Ok(UserStatus {
            user_id: row.get(0)?,
            level: row.get(1)?,
            experience: row.get(2)?,
            total_exp: row.get(3)?,
            focus: row.get(4)?,
            productivity: row.get(5)?,
            creativity: row.get(6)?,
            stamina: row.get(7)?,
            knowledge: row.get(8)?,
            collaboration: row.get(9)?,
            updated_at: decode_ts(&updated_at)?,
            created_at: decode_ts(&created_at)?,
        })
    })())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use crate::storage::{
        entities::{Attribute, NewModifier},
        Database,
    };

    use super::StatusStore;

    fn store() -> StatusStore {
        StatusStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn get_or_create_seeds_once() {
        let store = store();

        let first = store.get_or_create("local").await.unwrap();
        assert_eq!(first.level, 1);
        assert_eq!(first.total_exp, 0);
        assert_eq!(
            (first.focus, first.productivity, first.creativity),
            (50, 50, 50)
        );
        assert_eq!(
            (first.stamina, first.knowledge, first.collaboration),
            (100, 10, 30)
        );

        let second = store.get_or_create("local").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn save_round_trips() {
        let store = store();
        let mut status = store.get_or_create("local").await.unwrap();
        status.total_exp = 120;
        status.level = 2;
        status.experience = 20;
        status.focus = 58;

        store.save(&mut status).await.unwrap();

        let reread = store.get_or_create("local").await.unwrap();
        assert_eq!(reread.total_exp, 120);
        assert_eq!(reread.level, 2);
        assert_eq!(reread.experience, 20);
        assert_eq!(reread.focus, 58);
        // Stored timestamps are whole seconds.
        assert_eq!(reread.updated_at.timestamp(), status.updated_at.timestamp());
    }

    #[tokio::test]
    async fn active_modifiers_exclude_expired() {
        let store = store();
        store.get_or_create("local").await.unwrap();
        let now = Utc::now();

        store
            .create_modifier(NewModifier {
                user_id: "local".into(),
                attribute: Attribute::Focus,
                value: -10,
                reason: "late night".into(),
                expires_at: Some(now - Duration::minutes(1)),
            })
            .await
            .unwrap();
        let active = store
            .create_modifier(NewModifier {
                user_id: "local".into(),
                attribute: Attribute::Stamina,
                value: 5,
                reason: "coffee".into(),
                expires_at: Some(now + Duration::hours(1)),
            })
            .await
            .unwrap();
        let permanent = store
            .create_modifier(NewModifier {
                user_id: "local".into(),
                attribute: Attribute::Knowledge,
                value: 2,
                reason: "course finished".into(),
                expires_at: None,
            })
            .await
            .unwrap();

        let listed = store.list_active_modifiers("local", now).await.unwrap();
        assert_eq!(listed.len(), 2);
        // Newest first.
        assert_eq!(listed[0].id, permanent.id);
        assert_eq!(listed[1].id, active.id);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let store = store();
        store.get_or_create("local").await.unwrap();
        let now = Utc::now();

        for (value, expires_at) in [
            (1, Some(now - Duration::hours(1))),
            (2, Some(now + Duration::hours(1))),
            (3, None),
        ] {
            store
                .create_modifier(NewModifier {
                    user_id: "local".into(),
                    attribute: Attribute::Focus,
                    value,
                    reason: "test".into(),
                    expires_at,
                })
                .await
                .unwrap();
        }

        let swept = store.sweep_expired(now).await.unwrap();
        assert_eq!(swept, 1);

        let remaining = store.list_active_modifiers("local", now).await.unwrap();
        assert_eq!(remaining.len(), 2);
    }
}
