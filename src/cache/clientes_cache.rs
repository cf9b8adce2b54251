// ============================================================================
// CLIENTES CACHE - Facade used by request handling
// ============================================================================

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::codec::{self, EntryMeta};
use super::error::{CacheError, PopulateError};
use super::invalidation::InvalidationManager;
use super::stampede::{Populated, StampedeGuard};
use super::stats::{CacheOp, CacheStatsSnapshot, StatsCollector};
use super::store::{CacheStore, PipelineOp};
use crate::cache_key::{CacheKeyBuilder, EntryType};
use crate::cache_ttl::CacheTtl;
use crate::observability::record_cache_access;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheHealth {
    Ok,
    Degraded(String),
}

/// Read-through cache for clientes. Lookups never fail: store outages and
/// corrupt entries read as misses.
#[derive(Clone)]
pub struct ClienteCache {
    store: Arc<dyn CacheStore>,
    keys: CacheKeyBuilder,
    ttl: CacheTtl,
    invalidation: InvalidationManager,
    guard: StampedeGuard,
    stats: StatsCollector,
}

impl ClienteCache {
    pub fn new(store: Arc<dyn CacheStore>, keys: CacheKeyBuilder, ttl: CacheTtl) -> Self {
        Self {
            invalidation: InvalidationManager::new(store.clone(), keys.clone()),
            guard: StampedeGuard::new(store.clone(), keys.clone(), ttl.lock),
            stats: StatsCollector::new(store.clone(), keys.clone(), ttl.stats_daily),
            store,
            keys,
            ttl,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.guard = self.guard.with_backoff(backoff);
        self
    }

    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    pub fn ttl(&self) -> &CacheTtl {
        &self.ttl
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub async fn lookup_entity<T: DeserializeOwned>(&self, entry_type: EntryType, id: &str) -> CacheLookup<T> {
        let key = self.keys.build_key(entry_type, id);
        let lookup = self.lookup(&key).await;
        record_cache_access(entry_type.tag(), lookup.is_hit());
        lookup
    }

    pub async fn lookup_page<T: DeserializeOwned>(&self, page: u32) -> CacheLookup<Vec<T>> {
        let key = self.keys.page_key(page);
        let lookup = self.lookup(&key).await;
        record_cache_access(EntryType::ClientesPage.tag(), lookup.is_hit());
        lookup
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> CacheLookup<T> {
        match codec::read_or_evict(self.store.as_ref(), key).await {
            Some(value) => CacheLookup::Hit(value),
            None => CacheLookup::Miss,
        }
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    pub async fn store_entity<T: Serialize>(
        &self,
        entry_type: EntryType,
        id: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = self.keys.build_key(entry_type, id);
        let bytes = codec::encode_entry(value, EntryMeta::now())?;
        self.store.set(&key, &bytes, ttl).await?;
        debug!(key = %key, ttl_secs = ttl.as_secs(), "💾 Cached entity");
        Ok(())
    }

    /// Cache an entity read from the database unless the key already holds
    /// something. A refresh or a delete marker written meanwhile wins.
    pub async fn fill_entity<T: Serialize>(
        &self,
        entry_type: EntryType,
        id: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let key = self.keys.build_key(entry_type, id);
        let bytes = codec::encode_entry(value, EntryMeta::now())?;
        let stored = self.store.set_if_absent(&key, &bytes, ttl).await?;
        if !stored {
            debug!(key = %key, "Entity key already written, skipping fill");
        }
        Ok(stored)
    }

    /// Leave a short-lived delete marker under the cliente key
    pub async fn mark_deleted(&self, id: &str) -> Result<(), CacheError> {
        let key = self.keys.build_key(EntryType::Cliente, id);
        self.store.set(&key, codec::TOMBSTONE, self.ttl.short).await?;
        debug!(key = %key, "🪦 Cliente marked deleted in cache");
        Ok(())
    }

    /// Cache a page and register it in the page index in one batch
    pub async fn store_page<T: Serialize>(&self, page: u32, values: &[T], ttl: Duration) -> Result<(), CacheError> {
        let key = self.keys.page_key(page);
        let bytes = codec::encode_entry(&values, EntryMeta::for_page(page, values.len()))?;
        let mut ops = vec![PipelineOp::Set { key: key.clone(), value: bytes, ttl }];
        ops.extend(self.invalidation.track_page_ops(page, ttl));
        self.store.pipeline(ops).await?;
        debug!(key = %key, items = values.len(), "💾 Cached page");
        Ok(())
    }

    // ========================================================================
    // GUARDED POPULATION
    // ========================================================================

    pub async fn page_or_populate<T, E, F, Fut>(
        &self,
        page: u32,
        ttl: Duration,
        fetch: F,
    ) -> Result<Populated<Vec<T>>, PopulateError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        let key = self.keys.page_key(page);
        let track = self.invalidation.track_page_ops(page, ttl);
        let populated = self
            .guard
            .get_or_populate_with(&key, ttl, track, |items: &Vec<T>| EntryMeta::for_page(page, items.len()), fetch)
            .await?;
        record_cache_access(EntryType::ClientesPage.tag(), populated.source.is_cache_hit());
        Ok(populated)
    }

    pub async fn total_or_populate<E, F, Fut>(&self, ttl: Duration, fetch: F) -> Result<Populated<u64>, PopulateError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u64, E>>,
    {
        let key = self.keys.total_count_key();
        let populated = self.guard.get_or_populate(&key, ttl, fetch).await?;
        record_cache_access(EntryType::Stats.tag(), populated.source.is_cache_hit());
        Ok(populated)
    }

    // ========================================================================
    // INVALIDATION
    // ========================================================================

    pub async fn invalidate_entity(&self, id: &str) -> Result<(), CacheError> {
        self.invalidation.invalidate_entity(id).await
    }

    pub async fn invalidate_all_pages(&self) -> Result<usize, CacheError> {
        self.invalidation.invalidate_all_pages().await
    }

    pub async fn invalidate_after_write(&self, id: Option<&str>) -> Result<usize, CacheError> {
        self.invalidation.invalidate_after_write(id).await
    }

    pub async fn clear_all(&self) -> Result<usize, CacheError> {
        self.invalidation.clear_all().await
    }

    // ========================================================================
    // STATS & HEALTH
    // ========================================================================

    pub async fn record(&self, op: CacheOp) {
        self.stats.record(op).await
    }

    pub async fn get_stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot().await
    }

    pub async fn health_check(&self) -> CacheHealth {
        match self.store.ping().await {
            Ok(()) => CacheHealth::Ok,
            Err(e) => CacheHealth::Degraded(e.to_string()),
        }
    }
}
