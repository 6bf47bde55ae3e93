use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};

use tokio::sync::{Mutex, OwnedMutexGuard};
use types::ChildId;

use crate::{
    models::{decode, encode, Persisted},
    namespace::Namespace,
    stores::{KeyValueStore, MemoryStore},
    DatabaseError, NoopStore,
};

/// What became of a fail-soft write.
#[derive(Debug)]
pub enum WriteOutcome {
    Written,
    /// There was nothing to write.
    Unchanged,
    /// The write was dropped and logged.
    Skipped(DatabaseError),
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, WriteOutcome::Skipped(_))
    }

    pub(crate) fn from_result(namespace: Namespace, result: Result<(), DatabaseError>) -> Self {
        match result {
            Ok(()) => WriteOutcome::Written,
            Err(e) => {
                log_fallback(namespace, "write", &e);
                WriteOutcome::Skipped(e)
            }
        }
    }
}

pub(crate) fn log_fallback(namespace: Namespace, action: &str, error: &DatabaseError) {
    if error.is_missing_child() {
        tracing::debug!("Skipping {} {}: {}", namespace, action, error);
    } else {
        tracing::warn!("{} {} failed, using fallback: {}", namespace, action, error);
    }
}

type LockMap = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Holds one key's write lock. The key's entry leaves the lock map once the last
/// holder or waiter is gone.
struct KeyGuard {
    key: String,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Clones are only taken under this map lock, so a count of one means
        // nobody else holds or waits for the key.
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Per-child persistence over any [`KeyValueStore`].
///
/// Every value lives under `<namespace>:<child id>`. The `try_*` methods report every
/// failure. `save`, `load`, `remove` and `update` never fail: a blank child id turns
/// writes into no-ops and reads into the caller's default, and so do storage or parse
/// errors after being logged.
///
/// Writes to one key are serialized within the process, so `update` is a safe
/// read-modify-write.
#[derive(Clone)]
pub struct ChildStore {
    backend: Arc<dyn KeyValueStore>,
    locks: LockMap,
}

impl ChildStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopStore))
    }

    async fn lock_key(&self, key: &str) -> KeyGuard {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(key.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        KeyGuard {
            key: key.to_string(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked_key_count(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    async fn read<T: Persisted>(
        &self,
        namespace: Namespace,
        child: &ChildId,
    ) -> Result<Option<T>, DatabaseError> {
        match self.backend.get(&namespace.key(child)).await? {
            Some(raw) => decode(namespace, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn write<T: Persisted>(&self, key: &str, data: &T) -> Result<(), DatabaseError> {
        let raw = encode(data)?;
        self.backend.set(key, &raw).await
    }

    pub async fn try_save<T: Persisted>(
        &self,
        namespace: Namespace,
        child_id: &str,
        data: &T,
    ) -> Result<(), DatabaseError> {
        let child = ChildId::parse(child_id)?;
        let key = namespace.key(&child);
        let _guard = self.lock_key(&key).await;
        self.write(&key, data).await
    }

    pub async fn try_load<T: Persisted>(
        &self,
        namespace: Namespace,
        child_id: &str,
    ) -> Result<Option<T>, DatabaseError> {
        let child = ChildId::parse(child_id)?;
        self.read(namespace, &child).await
    }

    pub async fn try_remove(&self, namespace: Namespace, child_id: &str) -> Result<(), DatabaseError> {
        let child = ChildId::parse(child_id)?;
        let key = namespace.key(&child);
        let _guard = self.lock_key(&key).await;
        self.backend.remove(&key).await
    }

    /// Loads the value (or `default()` when absent or unreadable), applies `apply` and
    /// writes the result back while holding the key's lock.
    ///
    /// Data stored by a newer schema is left untouched and reported as an error.
    pub async fn try_update<T, R, D, F>(
        &self,
        namespace: Namespace,
        child_id: &str,
        default: D,
        apply: F,
    ) -> Result<R, DatabaseError>
    where
        T: Persisted,
        R: Send,
        D: FnOnce() -> T + Send,
        F: FnOnce(&mut T) -> R + Send,
    {
        let child = ChildId::parse(child_id)?;
        let key = namespace.key(&child);
        let _guard = self.lock_key(&key).await;

        let mut value = match self.read::<T>(namespace, &child).await {
            Ok(Some(value)) => value,
            Ok(None) => default(),
            Err(DatabaseError::Serialization(e)) => {
                tracing::warn!("Replacing malformed {} data for {}: {}", namespace, child, e);
                default()
            }
            Err(e) => return Err(e),
        };
        let result = apply(&mut value);
        self.write(&key, &value).await?;
        Ok(result)
    }

    pub async fn save<T: Persisted>(
        &self,
        namespace: Namespace,
        child_id: &str,
        data: &T,
    ) -> WriteOutcome {
        WriteOutcome::from_result(namespace, self.try_save(namespace, child_id, data).await)
    }

    pub async fn load<T: Persisted>(&self, namespace: Namespace, child_id: &str, default: T) -> T {
        match self.try_load(namespace, child_id).await {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                log_fallback(namespace, "read", &e);
                default
            }
        }
    }

    pub async fn remove(&self, namespace: Namespace, child_id: &str) -> WriteOutcome {
        WriteOutcome::from_result(namespace, self.try_remove(namespace, child_id).await)
    }

    pub async fn update<T, D, F>(
        &self,
        namespace: Namespace,
        child_id: &str,
        default: D,
        apply: F,
    ) -> WriteOutcome
    where
        T: Persisted,
        D: FnOnce() -> T + Send,
        F: FnOnce(&mut T) + Send,
    {
        let result = self.try_update(namespace, child_id, default, apply).await;
        WriteOutcome::from_result(namespace, result)
    }
}

impl std::fmt::Debug for ChildStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildStore").finish_non_exhaustive()
    }
}
