use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use types::{ActivityType, Clock, WeeklyStats};

use crate::{
    child_store::{log_fallback, ChildStore, WriteOutcome},
    models::SessionMarker,
    namespace::Namespace,
    DatabaseError,
};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Turns timed learning sessions into per-day minutes for the current week.
#[derive(Clone, Debug)]
pub struct LearningTimeTracker {
    store: ChildStore,
    clock: Arc<dyn Clock>,
}

impl LearningTimeTracker {
    pub fn new(store: ChildStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Marks the start of a session, replacing any unfinished one of the same type.
    pub async fn start_session(&self, child_id: &str, activity_type: ActivityType) -> WriteOutcome {
        let marker = SessionMarker {
            activity_type,
            started_at_ms: self.clock.now().timestamp_millis(),
        };
        self.store
            .save(Namespace::SessionStart(activity_type), child_id, &marker)
            .await
    }

    pub async fn try_end_session(
        &self,
        child_id: &str,
        activity_type: ActivityType,
    ) -> Result<u32, DatabaseError> {
        let namespace = Namespace::SessionStart(activity_type);
        let Some(marker) = self
            .store
            .try_load::<SessionMarker>(namespace, child_id)
            .await?
        else {
            return Ok(0);
        };

        let now = self.clock.now();
        let minutes = whole_minutes_between(marker.started_at_ms, now.timestamp_millis());
        self.store.try_remove(namespace, child_id).await?;
        if minutes > 0 {
            if let Err(e) = self.add_minutes_at(child_id, now, minutes).await {
                // Put the marker back so ending again can still credit the session.
                if let Err(restore) = self.store.try_save(namespace, child_id, &marker).await {
                    tracing::warn!(
                        "Lost {} minutes of {} for {}: {}",
                        minutes,
                        activity_type,
                        child_id,
                        restore
                    );
                }
                return Err(e);
            }
        }
        tracing::debug!(
            "{} session for {} lasted {} minutes",
            activity_type,
            child_id,
            minutes
        );
        Ok(minutes)
    }

    /// Ends the session and returns the whole minutes credited. Without a start
    /// marker, or when anything fails, nothing is credited and 0 is returned.
    pub async fn end_session(&self, child_id: &str, activity_type: ActivityType) -> u32 {
        match self.try_end_session(child_id, activity_type).await {
            Ok(minutes) => minutes,
            Err(e) => {
                log_fallback(Namespace::SessionStart(activity_type), "end session", &e);
                0
            }
        }
    }

    pub async fn try_record_minutes(&self, child_id: &str, minutes: i64) -> Result<(), DatabaseError> {
        if minutes <= 0 {
            return Ok(());
        }
        let minutes = u32::try_from(minutes).unwrap_or(u32::MAX);
        self.add_minutes_at(child_id, self.clock.now(), minutes).await
    }

    /// Adds minutes to today's bucket. Zero or negative amounts are ignored.
    pub async fn record_minutes(&self, child_id: &str, minutes: i64) -> WriteOutcome {
        if minutes <= 0 {
            return WriteOutcome::Unchanged;
        }
        WriteOutcome::from_result(
            Namespace::WeeklyLearningStats,
            self.try_record_minutes(child_id, minutes).await,
        )
    }

    async fn add_minutes_at(
        &self,
        child_id: &str,
        now: DateTime<FixedOffset>,
        minutes: u32,
    ) -> Result<(), DatabaseError> {
        self.store
            .try_update(
                Namespace::WeeklyLearningStats,
                child_id,
                || WeeklyStats::empty_week(now),
                |stats: &mut WeeklyStats| {
                    if stats.add_minutes(now, minutes) {
                        tracing::info!("Started a new learning week for {}", child_id);
                    }
                },
            )
            .await
    }

    /// This week's minutes. A stored week that has already ended reads as an empty
    /// current week.
    pub async fn get_weekly_stats(&self, child_id: &str) -> WeeklyStats {
        let now = self.clock.now();
        match self
            .store
            .try_load::<WeeklyStats>(Namespace::WeeklyLearningStats, child_id)
            .await
        {
            Ok(Some(stats)) if stats.is_current(now) => stats,
            Ok(_) => WeeklyStats::empty_week(now),
            Err(e) => {
                log_fallback(Namespace::WeeklyLearningStats, "read", &e);
                WeeklyStats::empty_week(now)
            }
        }
    }
}

/// Elapsed whole minutes, rounded down. A start in the future counts as zero.
fn whole_minutes_between(start_ms: i64, end_ms: i64) -> u32 {
    let elapsed = end_ms.saturating_sub(start_ms);
    if elapsed <= 0 {
        return 0;
    }
    u32::try_from(elapsed / MILLIS_PER_MINUTE).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use types::ManualClock;

    use super::*;
    use crate::stores::{KeyValueStore, MemoryStore};

    /// Refuses writes to weekly stats while `failing` is set.
    #[derive(Debug, Default)]
    struct FlakyStatsStore {
        inner: MemoryStore,
        failing: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStatsStore {
        async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
            let failing = self.failing.load(std::sync::atomic::Ordering::SeqCst);
            if failing && key.starts_with(&*Namespace::WeeklyLearningStats.prefix()) {
                return Err(DatabaseError::Query("disk full".to_string()));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), DatabaseError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_credit_keeps_the_session_open() {
        let backend = Arc::new(FlakyStatsStore::default());
        let start = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 6, 10, 0, 0)
            .unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let tracker = LearningTimeTracker::new(ChildStore::new(backend.clone()), clock.clone());

        tracker.start_session("kid", ActivityType::Museum).await;
        clock.advance(Duration::minutes(12));
        backend
            .failing
            .store(true, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(tracker.end_session("kid", ActivityType::Museum).await, 0);
        assert_eq!(tracker.get_weekly_stats("kid").await.total_minutes(), 0);

        backend
            .failing
            .store(false, std::sync::atomic::Ordering::SeqCst);
        clock.advance(Duration::minutes(3));
        assert_eq!(tracker.end_session("kid", ActivityType::Museum).await, 15);
        assert_eq!(tracker.get_weekly_stats("kid").await.total_minutes(), 15);
    }

    #[test]
    fn test_whole_minutes_round_down() {
        assert_eq!(whole_minutes_between(0, 59_999), 0);
        assert_eq!(whole_minutes_between(0, 60_000), 1);
        assert_eq!(whole_minutes_between(1_000, 1_000 + 12 * 60_000 + 59_000), 12);
    }

    #[test]
    fn test_start_after_end_is_zero() {
        assert_eq!(whole_minutes_between(120_000, 0), 0);
    }
}
