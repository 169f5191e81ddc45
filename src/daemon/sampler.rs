use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    notify::Notifier,
    utils::{clock::Clock, time::next_aligned},
};

use super::{
    foreground::{normalize_category, ForegroundDetector},
    services::{Services, DEFAULT_USER_ID},
};

pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5 * 60);
const SAMPLE_INTERVAL_MINUTES: i64 = 5;

/// Self-driving five-minute sampler. Each fire lands exactly on a wall-clock
/// boundary (12:00, 12:05, ...) rather than five minutes from process start,
/// and every wait races the shutdown token so cancellation is prompt.
pub struct ActivitySampler {
    services: Arc<Services>,
    detector: Box<dyn ForegroundDetector>,
    notifier: Notifier,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
}

impl ActivitySampler {
    pub fn new(
        services: Arc<Services>,
        detector: Box<dyn ForegroundDetector>,
        notifier: Notifier,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            services,
            detector,
            notifier,
            shutdown,
            clock,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("activity sampler started");
        loop {
            let now = self.clock.time();
            let boundary = next_aligned(now, SAMPLE_INTERVAL);
            let wait = (boundary - now).to_std().unwrap_or(Duration::ZERO);

            select! {
                _ = self.shutdown.cancelled() => {
                    info!("activity sampler stopped");
                    return Ok(());
                }
                _ = self.clock.sleep(wait) => {}
            }

            if let Err(e) = self.tick(boundary).await {
                error!("sampling tick failed {e:?}");
            }
        }
    }

    async fn tick(&mut self, at: DateTime<Utc>) -> Result<()> {
        let category = match self.detector.frontmost_app() {
            Ok(raw) => Some(normalize_category(&raw)),
            Err(e) => {
                // Still record presence; the sample just loses its category.
                warn!("foreground app detection failed {e:?}");
                None
            }
        };

        debug!("recording sample at {at} for {category:?}");
        self.services.activity.record(at, category.as_deref()).await?;

        if let Some(category) = &category {
            let level_up = self
                .services
                .game
                .process_activity(DEFAULT_USER_ID, category, SAMPLE_INTERVAL_MINUTES)
                .await?;

            if let Some(level_up) = level_up {
                info!("level up {} -> {}", level_up.from, level_up.to);
                if self.services.settings.notification_enabled {
                    if let Err(e) = self.notifier.send(
                        "Sidekick",
                        &format!("Level up! You reached level {}", level_up.to),
                    ) {
                        warn!("failed to deliver level-up notification {e:?}");
                    }
                }
            }
        }

        let swept = self.services.game.sweep_expired(self.clock.time()).await?;
        if swept > 0 {
            debug!("swept {swept} expired modifiers");
        }

        Ok(())
    }
}

#[cfg(test)]
mod sampler_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use crate::{
        config::Settings,
        daemon::foreground::MockForegroundDetector,
        notify::Notifier,
        storage::Database,
        utils::{clock::Clock, logging::TEST_LOGGING},
    };

    use super::{ActivitySampler, Services};

    /// Wall clock derived from tokio's (paused) timer so the test can warp
    /// through sampling boundaries instantly.
    struct TestClock {
        start_time: DateTime<Utc>,
        reference: Instant,
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        async fn sleep(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn samples_land_on_five_minute_boundaries() -> Result<()> {
        *TEST_LOGGING;
        let mut detector = MockForegroundDetector::new();
        detector
            .expect_frontmost_app()
            .returning(|| Ok("Visual Studio Code".to_string()));

        let services = Arc::new(Services::new(
            Arc::new(Database::open_in_memory()?),
            Settings {
                notification_enabled: false,
                ..Settings::default()
            },
        ));
        let shutdown = CancellationToken::new();
        let start_time = Utc.with_ymd_and_hms(2024, 3, 15, 12, 1, 30).unwrap();

        let sampler = ActivitySampler::new(
            services.clone(),
            Box::new(detector),
            Notifier::with_backends(vec![]),
            shutdown.clone(),
            Box::new(TestClock {
                start_time,
                reference: Instant::now(),
            }),
        );

        let (_, sampler_result) = tokio::join!(
            async {
                // Covers the 12:05 and 12:10 boundaries, not a third.
                tokio::time::sleep(Duration::from_secs(11 * 60)).await;
                shutdown.cancel();
            },
            sampler.run(),
        );
        sampler_result?;

        let samples = services.activity.logs(Some(start_time), None).await?;
        assert_eq!(samples.len(), 2);
        assert_eq!(
            samples[1].recorded_at,
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 5, 0).unwrap()
        );
        assert_eq!(
            samples[0].recorded_at,
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 10, 0).unwrap()
        );
        assert_eq!(samples[0].app_category.as_deref(), Some("Code Editor"));

        let (status, _) = services.game.effective_status("local").await?;
        assert_eq!(status.total_exp, 30);
        Ok(())
    }
}
