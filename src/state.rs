use std::env;
use std::sync::Arc;
use tracing::info;

use crate::cache::{CacheStore, ClienteCache, RedisCacheStore};
use crate::cache_key::{CacheKeyBuilder, DEFAULT_KEY_PREFIX};
use crate::cache_ttl::CacheTtl;
use crate::db::{ClienteStore, PgClienteStore};
use crate::domains::clientes::ClienteService;
use crate::optimization::{create_optimized_db_pool, create_redis_pool, DatabaseConfig, RedisConfig};
use crate::tasks::BackgroundTasks;

/// Estado compartido de la aplicación.
/// Contiene el servicio de clientes (store + caché) y el pool de tareas en segundo plano.
#[derive(Clone)]
pub struct AppState {
    pub clientes: ClienteService,
    pub tasks: BackgroundTasks,
}

impl AppState {
    pub async fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").map_err(|e| anyhow::anyhow!("DATABASE_URL must be set: {}", e))?;
        let db_pool = create_optimized_db_pool(&database_url, DatabaseConfig::from_env()).await?;
        let store = PgClienteStore::new(db_pool);
        store.ensure_schema().await?;

        let redis_pool = create_redis_pool(&RedisConfig::from_env())
            .map_err(|e| anyhow::anyhow!("Failed to create Redis pool: {}", e))?;
        let cache_store = RedisCacheStore::new(redis_pool);

        let prefix = env::var("CACHE_KEY_PREFIX").unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string());
        let ttl = CacheTtl::from_env();
        let tasks = BackgroundTasks::from_env();

        info!(
            prefix = %prefix,
            ttl_default = ttl.default.as_secs(),
            background_concurrency = tasks.concurrency(),
            "⚙️ Cache configuration loaded"
        );

        Ok(Self::with_components(
            Arc::new(store),
            Arc::new(cache_store),
            CacheKeyBuilder::new(prefix),
            ttl,
            tasks,
        ))
    }

    /// Wire the application from already-built backends
    pub fn with_components(
        store: Arc<dyn ClienteStore>,
        cache_store: Arc<dyn CacheStore>,
        keys: CacheKeyBuilder,
        ttl: CacheTtl,
        tasks: BackgroundTasks,
    ) -> Self {
        let cache = ClienteCache::new(cache_store, keys, ttl);
        let clientes = ClienteService::new(store, cache, tasks.clone());
        Self { clientes, tasks }
    }
}
