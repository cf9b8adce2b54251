// ============================================================================
// INVALIDATION MANAGER - Drops cache state made stale by a write
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::error::CacheError;
use super::store::{CacheStore, PipelineOp};
use crate::cache_key::{CacheKeyBuilder, EntryType};
use crate::observability::record_cache_invalidation;

/// Paginated lists shift on every insert/delete, so any write drops every
/// cached page. Pages are found through the page index set maintained by
/// [`InvalidationManager::track_page_ops`], never by guessing page numbers.
#[derive(Clone)]
pub struct InvalidationManager {
    store: Arc<dyn CacheStore>,
    keys: CacheKeyBuilder,
}

impl InvalidationManager {
    pub fn new(store: Arc<dyn CacheStore>, keys: CacheKeyBuilder) -> Self {
        Self { store, keys }
    }

    /// Ops that register `page` in the page index; batched with the page write
    pub fn track_page_ops(&self, page: u32, ttl: Duration) -> Vec<PipelineOp> {
        let index = self.keys.page_index_key();
        vec![
            PipelineOp::SetAdd { key: index.clone(), members: vec![page.to_string()] },
            PipelineOp::Expire { key: index, ttl },
        ]
    }

    /// Delete the cached entry of a single cliente. Deleting an absent key is fine.
    pub async fn invalidate_entity(&self, clave: &str) -> Result<(), CacheError> {
        let key = self.keys.entity_key(clave);
        let deleted = self.store.delete(&[key.clone()]).await?;
        record_cache_invalidation("entity");
        debug!(key = %key, deleted, "🗑️ Entity cache invalidated");
        Ok(())
    }

    /// Delete every indexed page in one atomic batch; returns how many were dropped
    pub async fn invalidate_all_pages(&self) -> Result<usize, CacheError> {
        let (ops, pages) = self.page_invalidation_ops().await?;
        if ops.is_empty() {
            return Ok(0);
        }
        self.store.pipeline(ops).await?;
        record_cache_invalidation("pages");
        info!(pages, "🗑️ Cache: invalidated cliente pages");
        Ok(pages)
    }

    /// Everything a create/update/delete can make stale: the entity (when
    /// known), the cached total count and every cached page.
    pub async fn invalidate_after_write(&self, clave: Option<&str>) -> Result<usize, CacheError> {
        let mut doomed = vec![self.keys.total_count_key()];
        if let Some(clave) = clave {
            doomed.push(self.keys.entity_key(clave));
        }

        let (page_ops, pages) = self.page_invalidation_ops().await?;
        let mut ops = vec![PipelineOp::Delete(doomed)];
        ops.extend(page_ops);
        self.store.pipeline(ops).await?;

        record_cache_invalidation("write");
        info!(clave = ?clave, pages, "🗑️ Cache invalidated after write");
        Ok(pages)
    }

    /// Administrative flush of every cliente and page entry
    pub async fn clear_all(&self) -> Result<usize, CacheError> {
        let mut keys = Vec::new();
        for entry_type in [EntryType::Cliente, EntryType::ClientesPage] {
            keys.extend(self.store.keys_matching(&self.keys.pattern(entry_type)).await?);
        }
        keys.push(self.keys.total_count_key());

        let deleted = self.store.delete(&keys).await?;
        record_cache_invalidation("flush");
        info!(deleted, "🗑️ Cache flushed");
        Ok(deleted as usize)
    }

    /// Only the members read here are removed from the index, so a page
    /// registered concurrently stays tracked for the next invalidation.
    async fn page_invalidation_ops(&self) -> Result<(Vec<PipelineOp>, usize), CacheError> {
        let index = self.keys.page_index_key();
        let members = self.store.members(&index).await?;
        if members.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let page_keys: Vec<String> = members
            .iter()
            .filter_map(|m| m.parse::<u32>().ok())
            .map(|page| self.keys.page_key(page))
            .collect();
        let pages = page_keys.len();

        Ok((
            vec![
                PipelineOp::Delete(page_keys),
                PipelineOp::SetRemove { key: index, members },
            ],
            pages,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_store::MemoryCacheStore;

    fn manager() -> (Arc<MemoryCacheStore>, InvalidationManager) {
        let store = Arc::new(MemoryCacheStore::new());
        let manager = InvalidationManager::new(store.clone(), CacheKeyBuilder::new("t:"));
        (store, manager)
    }

    async fn seed_page(store: &MemoryCacheStore, manager: &InvalidationManager, page: u32) {
        let ttl = Duration::from_secs(300);
        let mut ops = vec![PipelineOp::Set { key: format!("t:clientes_page:{page}"), value: b"[]".to_vec(), ttl }];
        ops.extend(manager.track_page_ops(page, ttl));
        store.pipeline(ops).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_entity_is_idempotent() {
        let (store, manager) = manager();
        store.set("t:cliente:007", b"{}", Duration::from_secs(60)).await.unwrap();
        manager.invalidate_entity("007").await.unwrap();
        manager.invalidate_entity("007").await.unwrap();
        assert!(!store.exists("t:cliente:007").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_all_pages_uses_index_beyond_any_bound() {
        let (store, manager) = manager();
        for page in [1, 2, 150, 9_999] {
            seed_page(&store, &manager, page).await;
        }
        assert_eq!(manager.invalidate_all_pages().await.unwrap(), 4);
        for page in [1, 2, 150, 9_999] {
            assert!(!store.exists(&format!("t:clientes_page:{page}")).await.unwrap());
        }
        assert!(!store.exists("t:clientes_page:index").await.unwrap());
        assert_eq!(manager.invalidate_all_pages().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_after_write_drops_entity_count_and_pages() {
        let (store, manager) = manager();
        seed_page(&store, &manager, 1).await;
        store.set("t:cliente:001", b"{}", Duration::from_secs(60)).await.unwrap();
        store.set("t:cliente:002", b"{}", Duration::from_secs(60)).await.unwrap();
        store.set("t:stats:total_clientes", b"{}", Duration::from_secs(60)).await.unwrap();

        assert_eq!(manager.invalidate_after_write(Some("001")).await.unwrap(), 1);
        assert!(!store.exists("t:cliente:001").await.unwrap());
        assert!(store.exists("t:cliente:002").await.unwrap());
        assert!(!store.exists("t:stats:total_clientes").await.unwrap());
        assert!(!store.exists("t:clientes_page:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_all_keeps_stats_counters() {
        let (store, manager) = manager();
        seed_page(&store, &manager, 3).await;
        store.set("t:cliente:001", b"{}", Duration::from_secs(60)).await.unwrap();
        store.set("t:stats:hit:total", b"5", Duration::from_secs(60)).await.unwrap();

        manager.clear_all().await.unwrap();
        assert!(store.keys_matching("t:cliente*").await.unwrap().is_empty());
        assert!(store.exists("t:stats:hit:total").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_outage_is_reported() {
        let (store, manager) = manager();
        store.set_unavailable(true);
        assert!(manager.invalidate_entity("001").await.unwrap_err().is_unavailable());
    }
}
