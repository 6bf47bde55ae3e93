use async_trait::async_trait;

use crate::DatabaseError;

/// Raw string storage behind [`crate::ChildStore`]. Keys arrive fully namespaced.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
    async fn remove(&self, key: &str) -> Result<(), DatabaseError>;
}
