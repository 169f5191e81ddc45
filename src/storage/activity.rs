use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::utils::time::truncate_to_minute;

use super::{decode_ts, encode_ts, entities::ActivitySample, Database, StoreError};

/// Append-only log of five-minute presence samples.
pub struct ActivityStore {
    db: Arc<Database>,
}

impl ActivityStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Records a sample for the minute containing `at`. A sample already
    /// present for that minute is left untouched and reported as success.
    pub async fn record_sample(
        &self,
        at: DateTime<Utc>,
        category: Option<&str>,
    ) -> Result<(), StoreError> {
        let minute = truncate_to_minute(at);
        let conn = self.db.conn().await;
        conn.execute(
            "INSERT OR IGNORE INTO activity_logs (recorded_at, app_category) VALUES (?1, ?2)",
            params![encode_ts(minute), category],
        )?;
        Ok(())
    }

    /// Samples within the inclusive range, most recent first. Reversed
    /// bounds are swapped rather than rejected.
    pub async fn query_range(
        &self,
        mut from: DateTime<Utc>,
        mut to: DateTime<Utc>,
    ) -> Result<Vec<ActivitySample>, StoreError> {
        if from > to {
            std::mem::swap(&mut from, &mut to);
        }
        let conn = self.db.conn().await;
        let mut statement = conn.prepare(
            "SELECT id, recorded_at, app_category
             FROM activity_logs
             WHERE recorded_at >= ?1 AND recorded_at <= ?2
             ORDER BY recorded_at DESC",
        )?;
        let rows = statement.query_map(params![encode_ts(from), encode_ts(to)], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut samples = Vec::new();
        for row in rows {
            let (id, recorded_at, app_category) = row?;
            samples.push(ActivitySample {
                id,
                recorded_at: decode_ts(&recorded_at)?,
                app_category,
            });
        }
        Ok(samples)
    }

    /// Minutes spent per app category in the inclusive range. Each sample
    /// counts as five minutes; categories without samples are omitted.
    pub async fn app_usage_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        let conn = self.db.conn().await;
        let mut statement = conn.prepare(
            "SELECT app_category, COUNT(*)
             FROM activity_logs
             WHERE recorded_at >= ?1 AND recorded_at <= ?2
               AND app_category IS NOT NULL
             GROUP BY app_category",
        )?;
        let rows = statement.query_map(params![encode_ts(from), encode_ts(to)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut usage = BTreeMap::new();
        for row in rows {
            let (category, count) = row?;
            usage.insert(category, count * 5);
        }
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use crate::storage::Database;

    use super::ActivityStore;

    fn store() -> ActivityStore {
        ActivityStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn duplicate_minute_is_recorded_once() {
        let store = store();
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 5, 11).unwrap();

        store.record_sample(at, Some("Code Editor")).await.unwrap();
        // Same minute, different second and category.
        store
            .record_sample(at + Duration::seconds(20), Some("Browser"))
            .await
            .unwrap();

        let samples = store
            .query_range(at - Duration::hours(1), at + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].app_category.as_deref(), Some("Code Editor"));
        assert_eq!(
            samples[0].recorded_at,
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 5, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn range_is_inclusive_and_newest_first() {
        let store = store();
        let base = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        for offset in [0, 5, 10, 15] {
            store
                .record_sample(base + Duration::minutes(offset), None)
                .await
                .unwrap();
        }

        let samples = store
            .query_range(base, base + Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].recorded_at, base + Duration::minutes(10));
        assert_eq!(samples[2].recorded_at, base);
    }

    #[tokio::test]
    async fn usage_summary_counts_five_minutes_per_sample() {
        let store = store();
        let base = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        for (offset, category) in [
            (0, Some("Code Editor")),
            (5, Some("Code Editor")),
            (10, Some("Slack")),
            (15, None),
        ] {
            store
                .record_sample(base + Duration::minutes(offset), category)
                .await
                .unwrap();
        }

        let usage = store
            .app_usage_summary(base, base + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(usage.get("Code Editor"), Some(&10));
        assert_eq!(usage.get("Slack"), Some(&5));
        // Samples without a category never show up as a zero entry.
        assert_eq!(usage.len(), 2);
    }
}
