pub mod child_store;
pub mod config;
pub mod error;
pub mod models;
pub mod namespace;
pub mod retry;
pub mod stores;
pub mod trackers;


pub use child_store::{ChildStore, WriteOutcome};
pub use config::DatabaseConfig;
pub use error::DatabaseError;
pub use models::{Persisted, PuzzleProgress, SessionMarker};
pub use namespace::Namespace;
pub use retry::retry_with_backoff;
pub use stores::{KeyValueStore, MemoryStore, SqliteStore};
pub use trackers::{
    ActivityTracker, GameProgressStore, LearningTimeTracker, DEFAULT_ACTIVITY_LOG_CAPACITY,
};

// NoopStore for when persistence is not needed
pub struct NoopStore;

#[async_trait::async_trait]
impl KeyValueStore for NoopStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<(), DatabaseError> {
        Ok(())
    }
}
