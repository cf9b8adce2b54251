// ============================================================================
// CACHE MODULE - Read-through cache para clientes
// ============================================================================

pub mod clientes_cache;
pub mod codec;
pub mod error;
pub mod invalidation;
pub mod memory_store;
pub mod stampede;
pub mod stats;
pub mod store;

pub use clientes_cache::{CacheHealth, CacheLookup, ClienteCache};
pub use codec::{CacheEntry, EntryMeta};
pub use error::{CacheError, PopulateError};
pub use invalidation::InvalidationManager;
pub use memory_store::MemoryCacheStore;
pub use stampede::{Populated, PopulateSource, StampedeGuard};
pub use stats::{CacheOp, CacheStatsSnapshot, OpCounts, StatsCollector};
pub use store::{CacheStore, PipelineOp, RedisCacheStore, StoreTimeouts};
