// ============================================================================
// STATS COLLECTOR - Daily and lifetime cache operation counters
// ============================================================================

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::error::CacheError;
use super::store::{CacheStore, PipelineOp};
use crate::cache_key::{CacheKeyBuilder, EntryType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOp {
    Hit,
    Miss,
    Set,
    Invalidate,
}

impl CacheOp {
    pub const ALL: [CacheOp; 4] = [CacheOp::Hit, CacheOp::Miss, CacheOp::Set, CacheOp::Invalidate];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheOp::Hit => "hit",
            CacheOp::Miss => "miss",
            CacheOp::Set => "set",
            CacheOp::Invalidate => "invalidate",
        }
    }
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpCounts {
    pub today: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub available: bool,
    pub date: String,
    pub operations: BTreeMap<&'static str, OpCounts>,
    /// Live keys per entry type
    pub keys: BTreeMap<&'static str, usize>,
    /// Hits over hits + misses, all time
    pub hit_rate: f64,
}

impl CacheStatsSnapshot {
    fn empty(date: NaiveDate, available: bool) -> Self {
        Self {
            available,
            date: date.format("%Y-%m-%d").to_string(),
            operations: CacheOp::ALL.iter().map(|op| (op.as_str(), OpCounts::default())).collect(),
            keys: [EntryType::Cliente, EntryType::ClientesPage]
                .iter()
                .map(|t| (t.tag(), 0))
                .collect(),
            hit_rate: 0.0,
        }
    }
}

#[derive(Clone)]
pub struct StatsCollector {
    store: Arc<dyn CacheStore>,
    keys: CacheKeyBuilder,
    daily_ttl: Duration,
}

impl StatsCollector {
    pub fn new(store: Arc<dyn CacheStore>, keys: CacheKeyBuilder, daily_ttl: Duration) -> Self {
        Self { store, keys, daily_ttl }
    }

    /// Count one operation for today and overall. Never fails the caller.
    pub async fn record(&self, op: CacheOp) {
        self.record_on(op, Utc::now().date_naive()).await
    }

    pub async fn record_on(&self, op: CacheOp, date: NaiveDate) {
        let daily = self.keys.stats_daily_key(op.as_str(), &date.format("%Y-%m-%d").to_string());
        let ops = vec![
            PipelineOp::Incr(daily.clone()),
            PipelineOp::Expire { key: daily, ttl: self.daily_ttl },
            PipelineOp::Incr(self.keys.stats_total_key(op.as_str())),
        ];
        if let Err(e) = self.store.pipeline(ops).await {
            debug!(op = %op, error = %e, "Cache stats not recorded");
        }
    }

    pub async fn snapshot(&self) -> CacheStatsSnapshot {
        let today = Utc::now().date_naive();
        match self.try_snapshot(today).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(error = %e, "Cache stats unavailable");
                CacheStatsSnapshot::empty(today, false)
            }
        }
    }

    async fn try_snapshot(&self, today: NaiveDate) -> Result<CacheStatsSnapshot, CacheError> {
        let mut snapshot = CacheStatsSnapshot::empty(today, true);
        let date = snapshot.date.clone();

        for op in CacheOp::ALL {
            let counts = OpCounts {
                today: self.read_counter(&self.keys.stats_daily_key(op.as_str(), &date)).await?,
                total: self.read_counter(&self.keys.stats_total_key(op.as_str())).await?,
            };
            snapshot.operations.insert(op.as_str(), counts);
        }

        for entry_type in [EntryType::Cliente, EntryType::ClientesPage] {
            let found = self.store.keys_matching(&self.keys.pattern(entry_type)).await?;
            // Lock keys and the page index are bookkeeping, not cached data
            let count = found
                .iter()
                .filter(|k| !k.ends_with(":lock") && **k != self.keys.page_index_key())
                .count();
            snapshot.keys.insert(entry_type.tag(), count);
        }

        let hits = snapshot.operations.get("hit").map_or(0, |c| c.total);
        let misses = snapshot.operations.get("miss").map_or(0, |c| c.total);
        if hits + misses > 0 {
            snapshot.hit_rate = hits as f64 / (hits + misses) as f64;
        }
        Ok(snapshot)
    }

    async fn read_counter(&self, key: &str) -> Result<u64, CacheError> {
        Ok(self
            .store
            .get(key)
            .await?
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_store::MemoryCacheStore;

    fn collector(store: Arc<MemoryCacheStore>) -> StatsCollector {
        StatsCollector::new(store, CacheKeyBuilder::new("t:"), Duration::from_secs(7 * 24 * 3600))
    }

    #[tokio::test]
    async fn test_record_and_snapshot() {
        let store = Arc::new(MemoryCacheStore::new());
        let stats = collector(store.clone());
        stats.record(CacheOp::Hit).await;
        stats.record(CacheOp::Hit).await;
        stats.record(CacheOp::Hit).await;
        stats.record(CacheOp::Miss).await;
        store.set("t:cliente:001", b"{}", Duration::from_secs(60)).await.unwrap();
        store.set("t:cliente:001:lock", b"locked", Duration::from_secs(60)).await.unwrap();

        let snapshot = stats.snapshot().await;
        assert!(snapshot.available);
        assert_eq!(snapshot.operations["hit"], OpCounts { today: 3, total: 3 });
        assert_eq!(snapshot.operations["miss"], OpCounts { today: 1, total: 1 });
        assert_eq!(snapshot.operations["set"], OpCounts::default());
        assert_eq!(snapshot.keys["cliente"], 1);
        assert!((snapshot.hit_rate - 0.75).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_daily_counter_separate_from_total() {
        let store = Arc::new(MemoryCacheStore::new());
        let stats = collector(store.clone());
        let yesterday = Utc::now().date_naive().pred_opt().unwrap();
        stats.record_on(CacheOp::Set, yesterday).await;
        stats.record(CacheOp::Set).await;

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot.operations["set"], OpCounts { today: 1, total: 2 });
    }

    #[tokio::test]
    async fn test_unavailable_store_is_silent() {
        let store = Arc::new(MemoryCacheStore::new());
        store.set_unavailable(true);
        let stats = collector(store);
        stats.record(CacheOp::Hit).await;

        let snapshot = stats.snapshot().await;
        assert!(!snapshot.available);
        assert_eq!(snapshot.operations["hit"], OpCounts::default());
    }
}
