// ============================================================================
// CACHE STORE ADAPTER - Thin async wrapper over the key-value backend
// ============================================================================

use async_trait::async_trait;
use deadpool_redis::Pool as RedisPool;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::error::CacheError;

/// One command of an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOp {
    Set { key: String, value: Vec<u8>, ttl: Duration },
    Delete(Vec<String>),
    Incr(String),
    Expire { key: String, ttl: Duration },
    SetAdd { key: String, members: Vec<String> },
    SetRemove { key: String, members: Vec<String> },
}

/// Key-value store used by the cache layer.
///
/// Implementations bound every call with a deadline and report backend
/// outages as [`CacheError::StoreUnavailable`] or [`CacheError::Timeout`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;
    /// Returns how many of `keys` existed
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
    /// A zero TTL expires the key immediately
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;
    /// `SET NX EX`; true when this caller created the key
    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError>;
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError>;
    async fn members(&self, key: &str) -> Result<Vec<String>, CacheError>;
    async fn pipeline(&self, ops: Vec<PipelineOp>) -> Result<(), CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Per-operation deadlines
#[derive(Debug, Clone, Copy)]
pub struct StoreTimeouts {
    pub read: Duration,
    pub write: Duration,
    pub batch: Duration,
    pub scan: Duration,
    pub ping: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(2),
            write: Duration::from_secs(3),
            batch: Duration::from_secs(10),
            scan: Duration::from_secs(10),
            ping: Duration::from_secs(5),
        }
    }
}

const SCAN_COUNT: usize = 200;

/// Redis-backed store on top of a deadpool connection pool
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: RedisPool,
    timeouts: StoreTimeouts,
}

impl RedisCacheStore {
    pub fn new(pool: RedisPool) -> Self {
        Self::with_timeouts(pool, StoreTimeouts::default())
    }

    pub fn with_timeouts(pool: RedisPool, timeouts: StoreTimeouts) -> Self {
        Self { pool, timeouts }
    }

    /// Get a Redis connection from the pool
    async fn get_connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool.get().await.map_err(|e| {
            debug!("Failed to get Redis connection: {}", e);
            CacheError::StoreUnavailable(e.to_string())
        })
    }

    async fn with_deadline<T, F>(&self, op: &'static str, limit: Duration, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>> + Send,
    {
        match timeout(limit, fut).await {
            Ok(Err(e)) if e.is_unavailable() => {
                warn!(op, error = %e, "⚠️ Redis unavailable");
                Err(e)
            }
            Ok(result) => result,
            Err(_) => {
                warn!(op, timeout_ms = limit.as_millis() as u64, "⏱️ Redis operation timed out");
                Err(CacheError::Timeout { op, after: limit })
            }
        }
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.with_deadline("get", self.timeouts.read, async {
            let mut conn = self.get_connection().await?;
            Ok(conn.get::<_, Option<Vec<u8>>>(key).await?)
        })
        .await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.with_deadline("set", self.timeouts.write, async {
            let mut conn = self.get_connection().await?;
            conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl)).await?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.with_deadline("del", self.timeouts.write, async {
            let mut conn = self.get_connection().await?;
            Ok(conn.del::<_, u64>(keys).await?)
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.with_deadline("exists", self.timeouts.read, async {
            let mut conn = self.get_connection().await?;
            Ok(conn.exists::<_, bool>(key).await?)
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.with_deadline("expire", self.timeouts.write, async {
            let mut conn = self.get_connection().await?;
            Ok(conn.expire::<_, bool>(key, ttl.as_secs() as i64).await?)
        })
        .await
    }

    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError> {
        self.with_deadline("set_nx", self.timeouts.write, async {
            let mut conn = self.get_connection().await?;
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("EX")
                .arg(ttl_secs(ttl))
                .query_async(&mut conn)
                .await?;
            Ok(reply.is_some())
        })
        .await
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.with_deadline("scan", self.timeouts.scan, async {
            let mut conn = self.get_connection().await?;
            let mut cursor: u64 = 0;
            let mut keys = Vec::new();
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .query_async(&mut conn)
                    .await?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            keys.sort();
            keys.dedup();
            Ok(keys)
        })
        .await
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.with_deadline("smembers", self.timeouts.read, async {
            let mut conn = self.get_connection().await?;
            Ok(conn.smembers::<_, Vec<String>>(key).await?)
        })
        .await
    }

    async fn pipeline(&self, ops: Vec<PipelineOp>) -> Result<(), CacheError> {
        if ops.is_empty() {
            return Ok(());
        }
        self.with_deadline("pipeline", self.timeouts.batch, async {
            let mut conn = self.get_connection().await?;
            let mut pipe = redis::pipe();
            pipe.atomic();

            for op in &ops {
                match op {
                    PipelineOp::Set { key, value, ttl } => {
                        pipe.set_ex(key, value.as_slice(), ttl_secs(*ttl)).ignore();
                    }
                    PipelineOp::Delete(keys) if !keys.is_empty() => {
                        pipe.del(keys).ignore();
                    }
                    PipelineOp::Delete(_) => {}
                    PipelineOp::Incr(key) => {
                        pipe.incr(key, 1).ignore();
                    }
                    PipelineOp::Expire { key, ttl } => {
                        pipe.expire(key, ttl_secs(*ttl) as i64).ignore();
                    }
                    PipelineOp::SetAdd { key, members } if !members.is_empty() => {
                        pipe.sadd(key, members).ignore();
                    }
                    PipelineOp::SetRemove { key, members } if !members.is_empty() => {
                        pipe.srem(key, members).ignore();
                    }
                    PipelineOp::SetAdd { .. } | PipelineOp::SetRemove { .. } => {}
                }
            }

            pipe.query_async::<()>(&mut conn).await?;
            debug!(count = ops.len(), "📦 Redis pipeline executed");
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.with_deadline("ping", self.timeouts.ping, async {
            let mut conn = self.get_connection().await?;
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }
}
