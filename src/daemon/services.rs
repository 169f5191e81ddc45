use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, Local, Utc};
use now::DateTimeNow;

use crate::{
    config::Settings,
    scoring::{self, impact_for, LevelUp},
    storage::{
        activity::ActivityStore,
        entities::{ActivitySample, AttributeModifier, UserStatus},
        Database, StoreError,
    },
};

/// Single-user deployment: every request without an explicit user id lands
/// on this record.
pub const DEFAULT_USER_ID: &str = "local";

/// Business logic the RPC server and the sampler share. Thin on purpose:
/// bound normalization and scoring orchestration live here, storage details
/// in the stores, math in [crate::scoring].
pub struct Services {
    pub activity: ActivityService,
    pub game: GameService,
    pub settings: Settings,
}

impl Services {
    pub fn new(db: Arc<Database>, settings: Settings) -> Self {
        Self {
            activity: ActivityService::new(ActivityStore::new(db.clone())),
            game: GameService::new(crate::storage::status::StatusStore::new(db)),
            settings,
        }
    }
}

pub struct ActivityService {
    store: ActivityStore,
}

impl ActivityService {
    pub fn new(store: ActivityStore) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        at: DateTime<Utc>,
        category: Option<&str>,
    ) -> Result<(), StoreError> {
        self.store.record_sample(at, category).await
    }

    /// Range query with caller-friendly bounds: absent bounds default to the
    /// last 24 hours. The store already tolerates reversed input.
    pub async fn logs(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivitySample>, StoreError> {
        let now = Utc::now();
        let from = from.unwrap_or(now - Duration::hours(24));
        let to = to.unwrap_or(now);
        self.store.query_range(from, to).await
    }

    /// Per-category minutes since the local midnight.
    pub async fn usage_today(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        let start = Local::now().beginning_of_day().with_timezone(&Utc);
        self.store.app_usage_summary(start, Utc::now()).await
    }
}

pub struct GameService {
    store: crate::storage::status::StatusStore,
}

impl GameService {
    pub fn new(store: crate::storage::status::StatusStore) -> Self {
        Self { store }
    }

    /// Runs one observed activity through the scoring engine and persists
    /// the result. Returns the level transition when one happened.
    pub async fn process_activity(
        &self,
        user_id: &str,
        category: &str,
        elapsed_minutes: i64,
    ) -> Result<Option<LevelUp>, StoreError> {
        let mut status = self.store.get_or_create(user_id).await?;
        let level_up = scoring::apply_activity(&mut status, &impact_for(category), elapsed_minutes);
        self.store.save(&mut status).await?;
        Ok(level_up)
    }

    /// Base status with active modifiers overlaid, plus those modifiers.
    pub async fn effective_status(
        &self,
        user_id: &str,
    ) -> Result<(UserStatus, Vec<AttributeModifier>), StoreError> {
        let base = self.store.get_or_create(user_id).await?;
        let modifiers = self.store.list_active_modifiers(user_id, Utc::now()).await?;
        let effective = scoring::effective_status(&base, &modifiers);
        Ok((effective, modifiers))
    }

    pub async fn sweep_expired(&self, as_of: DateTime<Utc>) -> Result<usize, StoreError> {
        self.store.sweep_expired(as_of).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use crate::{config::Settings, storage::Database};

    use super::Services;

    fn services() -> Services {
        Services::new(
            Arc::new(Database::open_in_memory().unwrap()),
            Settings::default(),
        )
    }

    #[tokio::test]
    async fn reversed_bounds_are_swapped() {
        let services = services();
        let base = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        for offset in [0, 5, 10] {
            services
                .activity
                .record(base + Duration::minutes(offset), None)
                .await
                .unwrap();
        }

        let logs = services
            .activity
            .logs(Some(base + Duration::minutes(10)), Some(base))
            .await
            .unwrap();
        assert_eq!(logs.len(), 3);
    }

    #[tokio::test]
    async fn activity_processing_persists_scoring() {
        let services = services();
        let level_up = services
            .game
            .process_activity("local", "Code Editor", 5)
            .await
            .unwrap();
        assert!(level_up.is_none());

        let (status, modifiers) = services.game.effective_status("local").await.unwrap();
        assert_eq!(status.total_exp, 15);
        assert_eq!(status.focus, 58);
        assert!(modifiers.is_empty());
    }

    #[tokio::test]
    async fn repeated_editing_eventually_levels_up() {
        let services = services();
        let mut transitions = Vec::new();
        // 7 ticks x 15 exp crosses the level-2 gate at 100.
        for _ in 0..7 {
            if let Some(v) = services
                .game
                .process_activity("local", "Code Editor", 5)
                .await
                .unwrap()
            {
                transitions.push(v);
            }
        }
        assert_eq!(transitions.len(), 1);
        assert_eq!((transitions[0].from, transitions[0].to), (1, 2));

        let (status, _) = services.game.effective_status("local").await.unwrap();
        assert_eq!(status.total_exp, 105);
        assert_eq!(status.level, 2);
        assert_eq!(status.experience, 5);
    }
}
