// Connection pool configuration for the document store and the cache backend
use deadpool_redis::{Config as DeadpoolRedisConfig, Pool as RedisPool, PoolConfig, Runtime};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;
use std::time::Duration;
use tracing::info;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Database connection pool optimization
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5), // Fail fast instead of blocking
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DatabaseConfig {
    /// `DATABASE_MAX_CONNECTIONS` / `DATABASE_MIN_CONNECTIONS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections).max(1);
        Self {
            max_connections,
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", defaults.min_connections).min(max_connections),
            ..defaults
        }
    }
}

/// Create optimized database pool
pub async fn create_optimized_db_pool(database_url: &str, config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!("🔧 Creating database pool with {} max connections", config.max_connections);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("✅ Database pool created successfully");
    Ok(pool)
}

/// Redis connection pool configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: usize,
    pub wait_timeout: Duration,
    pub create_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 100,
            wait_timeout: Duration::from_millis(3000),
            create_timeout: Duration::from_millis(5000),
        }
    }
}

impl RedisConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env::var("REDIS_URL").unwrap_or(defaults.url),
            pool_size: env_or("REDIS_POOL_SIZE", defaults.pool_size).max(1),
            wait_timeout: Duration::from_millis(env_or("REDIS_WAIT_TIMEOUT_MS", 3000u64)),
            create_timeout: Duration::from_millis(env_or("REDIS_CREATE_TIMEOUT_MS", 5000u64)),
        }
    }
}

/// Build the deadpool-managed Redis pool. Connections are opened lazily, so an
/// unreachable server surfaces later as a cache outage instead of a startup failure.
pub fn create_redis_pool(config: &RedisConfig) -> Result<RedisPool, deadpool_redis::CreatePoolError> {
    info!(pool_size = config.pool_size, "🔧 Creating Redis pool");

    let mut pool_config = PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(config.wait_timeout);
    pool_config.timeouts.create = Some(config.create_timeout);
    pool_config.timeouts.recycle = Some(config.wait_timeout);

    let mut redis_config = DeadpoolRedisConfig::from_url(config.url.clone());
    redis_config.pool = Some(pool_config);

    let pool = redis_config.create_pool(Some(Runtime::Tokio1))?;
    info!("✅ Redis pool created successfully");
    Ok(pool)
}
