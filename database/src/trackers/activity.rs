use std::collections::BTreeMap;

use itertools::Itertools;
use tokio::sync::broadcast;
use types::{ActivityRecord, ActivityType};

use crate::{
    child_store::{log_fallback, ChildStore, WriteOutcome},
    namespace::Namespace,
    DatabaseError,
};

pub const DEFAULT_ACTIVITY_LOG_CAPACITY: usize = 50;
const SUBSCRIBER_BUFFER: usize = 64;

/// A bounded, most-recent-first log of finished activities per child.
///
/// Once a log holds `capacity` records, each new record evicts the oldest one.
/// Every successfully stored record is also broadcast to subscribers.
#[derive(Clone, Debug)]
pub struct ActivityTracker {
    store: ChildStore,
    capacity: usize,
    sender: broadcast::Sender<ActivityRecord>,
}

impl ActivityTracker {
    pub fn new(store: ChildStore) -> Self {
        Self::with_capacity(store, DEFAULT_ACTIVITY_LOG_CAPACITY)
    }

    pub fn with_capacity(store: ChildStore, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            store,
            capacity: capacity.max(1),
            sender,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Receives every record stored from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityRecord> {
        self.sender.subscribe()
    }

    pub async fn try_record_activity(&self, record: ActivityRecord) -> Result<(), DatabaseError> {
        let capacity = self.capacity;
        let entry = record.clone();
        self.store
            .try_update(
                Namespace::Activities,
                record.child_id.as_str(),
                Vec::new,
                move |log: &mut Vec<ActivityRecord>| {
                    log.insert(0, entry);
                    log.truncate(capacity);
                },
            )
            .await?;

        tracing::debug!("Recorded activity {}", record);
        // Nobody listening is fine.
        let _ = self.sender.send(record);
        Ok(())
    }

    pub async fn record_activity(&self, record: ActivityRecord) -> WriteOutcome {
        WriteOutcome::from_result(
            Namespace::Activities,
            self.try_record_activity(record).await,
        )
    }

    pub async fn try_query_activities(
        &self,
        child_id: &str,
    ) -> Result<Vec<ActivityRecord>, DatabaseError> {
        Ok(self
            .store
            .try_load(Namespace::Activities, child_id)
            .await?
            .unwrap_or_default())
    }

    /// The child's log, newest first. Empty when nothing is stored or it can't be read.
    pub async fn query_activities(&self, child_id: &str) -> Vec<ActivityRecord> {
        match self.try_query_activities(child_id).await {
            Ok(records) => records,
            Err(e) => {
                log_fallback(Namespace::Activities, "read", &e);
                Vec::new()
            }
        }
    }

    /// How many logged activities each type has, for a dashboard summary.
    pub async fn counts_by_type(&self, child_id: &str) -> BTreeMap<ActivityType, usize> {
        self.query_activities(child_id)
            .await
            .iter()
            .map(|record| record.activity_type)
            .counts()
            .into_iter()
            .collect()
    }
}
