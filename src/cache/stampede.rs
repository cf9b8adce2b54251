// ============================================================================
// STAMPEDE GUARD - Single-flight cache population through a lock key
// ============================================================================

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::codec::{self, EntryMeta};
use super::error::{CacheError, PopulateError};
use super::store::{CacheStore, PipelineOp};
use crate::cache_key::CacheKeyBuilder;

const LOCK_VALUE: &[u8] = b"locked";
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// Where a populated value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulateSource {
    Cache,
    Fetched,
    /// Fetched while the cache could not be used
    Uncached,
}

impl PopulateSource {
    pub fn is_cache_hit(self) -> bool {
        matches!(self, PopulateSource::Cache)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Populated<T> {
    pub value: T,
    pub source: PopulateSource,
}

/// Holds a lock key until released. Dropped while still armed (the populating
/// future was cancelled) it spawns the delete on the current runtime.
struct LockRelease {
    store: Arc<dyn CacheStore>,
    key: String,
    armed: bool,
}

impl LockRelease {
    fn new(store: Arc<dyn CacheStore>, key: String) -> Self {
        Self { store, key, armed: true }
    }

    async fn release(mut self) {
        if let Err(e) = self.store.delete(std::slice::from_ref(&self.key)).await {
            // The lock TTL bounds how long a lost release can block others
            warn!(lock = %self.key, error = %e, "⚠️ Failed to release cache lock");
        }
        self.armed = false;
    }
}

impl Drop for LockRelease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let store = self.store.clone();
        let key = std::mem::take(&mut self.key);
        debug!(lock = %key, "🔓 Population cancelled, releasing lock");
        handle.spawn(async move {
            if let Err(e) = store.delete(&[key.clone()]).await {
                warn!(lock = %key, error = %e, "⚠️ Failed to release cache lock");
            }
        });
    }
}

#[derive(Clone)]
pub struct StampedeGuard {
    store: Arc<dyn CacheStore>,
    keys: CacheKeyBuilder,
    lock_ttl: Duration,
    backoff: Duration,
}

impl StampedeGuard {
    pub fn new(store: Arc<dyn CacheStore>, keys: CacheKeyBuilder, lock_ttl: Duration) -> Self {
        Self { store, keys, lock_ttl, backoff: DEFAULT_BACKOFF }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn get_or_populate<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Populated<T>, PopulateError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_populate_with(key, ttl, Vec::new(), |_| EntryMeta::now(), fetch).await
    }

    /// Like [`get_or_populate`](Self::get_or_populate), with extra ops
    /// committed in the same batch as the value and a metadata builder for
    /// the stored envelope.
    pub async fn get_or_populate_with<T, E, F, Fut, M>(
        &self,
        key: &str,
        ttl: Duration,
        extra_ops: Vec<PipelineOp>,
        meta: M,
        fetch: F,
    ) -> Result<Populated<T>, PopulateError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        M: FnOnce(&T) -> EntryMeta,
    {
        if let Some(value) = self.read_cached::<T>(key).await {
            return Ok(Populated { value, source: PopulateSource::Cache });
        }

        let lock_key = self.keys.lock_key(key);
        let acquired = match self.store.set_if_absent(&lock_key, LOCK_VALUE, self.lock_ttl).await {
            Ok(acquired) => acquired,
            Err(e) => {
                debug!(key = %key, error = %e, "Cache lock unavailable, fetching uncached");
                let value = fetch().await.map_err(PopulateError::Fetch)?;
                return Ok(Populated { value, source: PopulateSource::Uncached });
            }
        };

        if !acquired {
            tokio::time::sleep(self.backoff).await;
            return match self.read_cached::<T>(key).await {
                Some(value) => Ok(Populated { value, source: PopulateSource::Cache }),
                None => Err(PopulateError::LockContention { key: key.to_string() }),
            };
        }

        let lock = LockRelease::new(self.store.clone(), lock_key);
        let fetched = fetch().await;
        let outcome = match fetched {
            Ok(value) => {
                let stored = self.write_back(key, ttl, extra_ops, meta(&value), &value).await;
                let source = if stored { PopulateSource::Fetched } else { PopulateSource::Uncached };
                Ok(Populated { value, source })
            }
            Err(e) => Err(PopulateError::Fetch(e)),
        };

        lock.release().await;
        outcome
    }

    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        codec::read_or_evict(self.store.as_ref(), key).await
    }

    async fn write_back<T: Serialize>(
        &self,
        key: &str,
        ttl: Duration,
        extra_ops: Vec<PipelineOp>,
        meta: EntryMeta,
        value: &T,
    ) -> bool {
        let bytes = match codec::encode_entry(value, meta) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "⚠️ Value not cacheable, serving uncached");
                return false;
            }
        };

        let mut ops = vec![PipelineOp::Set { key: key.to_string(), value: bytes, ttl }];
        ops.extend(extra_ops);
        match self.store.pipeline(ops).await {
            Ok(()) => true,
            Err(e @ CacheError::StoreUnavailable(_)) | Err(e @ CacheError::Timeout { .. }) => {
                debug!(key = %key, error = %e, "Cache unavailable during population");
                false
            }
            Err(e) => {
                warn!(key = %key, error = %e, "⚠️ Cache population failed");
                false
            }
        }
    }
}
