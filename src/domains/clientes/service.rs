// ============================================================================
// CLIENTE SERVICE - Cache-first reads, store-first writes
// ============================================================================

use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::ClienteError;
use super::validation::ContactoCliente;
use crate::cache::{CacheError, CacheLookup, CacheOp, CacheStatsSnapshot, ClienteCache, PopulateError, PopulateSource};
use crate::cache_key::EntryType;
use crate::db::{ClienteStore, StoreError};
use crate::models::{
    ClaveCliente, Cliente, ClienteCambios, FiltroBusqueda, NuevoCliente, ITEMS_PER_PAGE, MAX_PAGE, SEARCH_LIMIT,
};
use crate::tasks::BackgroundTasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Cache,
    Database,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::Cache => "cache",
            DataSource::Database => "database",
        }
    }

    pub fn is_cache(self) -> bool {
        self == DataSource::Cache
    }
}

impl From<PopulateSource> for DataSource {
    fn from(source: PopulateSource) -> Self {
        if source.is_cache_hit() {
            DataSource::Cache
        } else {
            DataSource::Database
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: DataSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientesPage {
    pub items: Vec<Cliente>,
    pub page: u32,
    pub limit: u32,
    /// Only computed for the first page
    pub total: Option<u64>,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConteoClientes {
    pub total_clientes: u64,
    pub total_pages: u64,
    pub items_per_page: u32,
}

impl ConteoClientes {
    pub fn from_total(total: u64) -> Self {
        Self {
            total_clientes: total,
            total_pages: total.div_ceil(u64::from(ITEMS_PER_PAGE)),
            items_per_page: ITEMS_PER_PAGE,
        }
    }
}

#[derive(Clone)]
pub struct ClienteService {
    store: Arc<dyn ClienteStore>,
    cache: ClienteCache,
    tasks: BackgroundTasks,
}

impl ClienteService {
    pub fn new(store: Arc<dyn ClienteStore>, cache: ClienteCache, tasks: BackgroundTasks) -> Self {
        Self { store, cache, tasks }
    }

    pub fn store(&self) -> &Arc<dyn ClienteStore> {
        &self.store
    }

    pub fn cache(&self) -> &ClienteCache {
        &self.cache
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    pub async fn create(&self, nuevo: NuevoCliente) -> Result<Cliente, ClienteError> {
        let raw = nuevo.clave_cliente.ok_or(ClienteError::MissingClave)?;
        let clave = ClaveCliente::try_from(&raw)?.normalize()?;

        if self.store.find_by_clave(&clave).await?.is_some() {
            return Err(ClienteError::AlreadyExists(clave));
        }

        let contacto = ContactoCliente::new(&nuevo.nombre, &nuevo.celular, &nuevo.email);
        let cliente = Cliente {
            id: Uuid::new_v4(),
            clave_cliente: clave.clone(),
            errores: contacto.errores(),
            nombre: contacto.nombre,
            celular: contacto.celular,
            email: contacto.email,
        };

        match self.store.insert(&cliente).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(clave)) => return Err(ClienteError::AlreadyExists(clave)),
            Err(e) => return Err(e.into()),
        }
        info!(clave = %clave, with_errores = cliente.errores.is_some(), "✅ Cliente created");

        self.refresh_after_write("cliente_create", cliente.clone());
        Ok(cliente)
    }

    pub async fn update(&self, clave: &str, cambios: ClienteCambios) -> Result<Cliente, ClienteError> {
        let clave = ClaveCliente::normalize_path(clave)?;
        let contacto = ContactoCliente::new(&cambios.nombre, &cambios.celular, &cambios.email);
        let errores = contacto.errores();
        let cambios = ClienteCambios { nombre: contacto.nombre, celular: contacto.celular, email: contacto.email };

        let cliente = self
            .store
            .update(&clave, &cambios, errores.as_ref())
            .await?
            .ok_or_else(|| ClienteError::NotFound(clave.clone()))?;
        info!(clave = %clave, "✏️ Cliente updated");

        self.refresh_after_write("cliente_update", cliente.clone());
        Ok(cliente)
    }

    pub async fn delete(&self, clave: &str) -> Result<(), ClienteError> {
        let clave = ClaveCliente::normalize_path(clave)?;
        if !self.store.delete(&clave).await? {
            return Err(ClienteError::NotFound(clave));
        }
        info!(clave = %clave, "🗑️ Cliente deleted");

        let cache = self.cache.clone();
        self.tasks.spawn("cliente_delete", async move {
            cache.invalidate_after_write(Some(&clave)).await?;
            cache.record(CacheOp::Invalidate).await;
            // keeps a read that started before the delete from refilling the key
            cache.mark_deleted(&clave).await?;
            Ok::<_, CacheError>(())
        });
        Ok(())
    }

    /// Invalidation first, then the fresh entity, in one job so the
    /// invalidation can never delete the entry written after it.
    fn refresh_after_write(&self, task: &'static str, cliente: Cliente) {
        let cache = self.cache.clone();
        let ttl = self.cache.ttl().default;
        self.tasks.spawn(task, async move {
            let clave = cliente.clave_cliente.clone();
            cache.invalidate_after_write(Some(&clave)).await?;
            cache.record(CacheOp::Invalidate).await;
            cache.store_entity(EntryType::Cliente, &clave, &cliente, ttl).await?;
            cache.record(CacheOp::Set).await;
            Ok::<_, CacheError>(())
        });
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub async fn get(&self, clave: &str) -> Result<Fetched<Cliente>, ClienteError> {
        let clave = ClaveCliente::normalize_path(clave)?;

        if let CacheLookup::Hit(cliente) = self.cache.lookup_entity::<Cliente>(EntryType::Cliente, &clave).await {
            self.record_in_background(CacheOp::Hit);
            return Ok(Fetched { value: cliente, source: DataSource::Cache });
        }
        self.record_in_background(CacheOp::Miss);

        let cliente = self
            .store
            .find_by_clave(&clave)
            .await?
            .ok_or_else(|| ClienteError::NotFound(clave.clone()))?;

        let cache = self.cache.clone();
        let ttl = self.cache.ttl().long;
        let cached = cliente.clone();
        self.tasks.spawn("cliente_populate", async move {
            if cache.fill_entity(EntryType::Cliente, &clave, &cached, ttl).await? {
                cache.record(CacheOp::Set).await;
            }
            Ok::<_, CacheError>(())
        });

        Ok(Fetched { value: cliente, source: DataSource::Database })
    }

    pub async fn list_page(&self, page: u32) -> Result<ClientesPage, ClienteError> {
        if !(1..=MAX_PAGE).contains(&page) {
            return Err(ClienteError::InvalidPage(page.to_string()));
        }
        let skip = u64::from(page - 1) * u64::from(ITEMS_PER_PAGE);
        let ttl = self.cache.ttl().default;

        let store = self.store.clone();
        let populated = self
            .cache
            .page_or_populate(page, ttl, || async move { store.find_page(skip, ITEMS_PER_PAGE).await })
            .await;

        let (items, source) = match populated {
            Ok(populated) => {
                self.record_population(populated.source);
                (populated.value, DataSource::from(populated.source))
            }
            Err(PopulateError::Fetch(e)) => return Err(e.into()),
            Err(PopulateError::LockContention { key }) => {
                debug!(key = %key, "Page still being populated, reading store directly");
                self.record_in_background(CacheOp::Miss);
                (self.store.find_page(skip, ITEMS_PER_PAGE).await?, DataSource::Database)
            }
        };

        let total = if page == 1 {
            match self.count().await {
                Ok(conteo) => Some(conteo.value.total_clientes),
                Err(e) => {
                    warn!(error = %e, "⚠️ Total unavailable, serving page 1 without it");
                    None
                }
            }
        } else {
            None
        };

        Ok(ClientesPage { items, page, limit: ITEMS_PER_PAGE, total, source })
    }

    pub async fn count(&self) -> Result<Fetched<ConteoClientes>, ClienteError> {
        let store = self.store.clone();
        let ttl = self.cache.ttl().short;
        let populated = self.cache.total_or_populate(ttl, || async move { store.count().await }).await;

        let (total, source) = match populated {
            Ok(populated) => (populated.value, DataSource::from(populated.source)),
            Err(PopulateError::Fetch(e)) => return Err(e.into()),
            Err(PopulateError::LockContention { .. }) => (self.store.count().await?, DataSource::Database),
        };
        Ok(Fetched { value: ConteoClientes::from_total(total), source })
    }

    pub async fn search(&self, filtro: FiltroBusqueda) -> Result<(Vec<Cliente>, u64), ClienteError> {
        let filtro = filtro.normalized();
        if filtro.is_empty() {
            return Err(ClienteError::MissingSearchCriteria);
        }
        Ok(self.store.search(&filtro, SEARCH_LIMIT).await?)
    }

    // ========================================================================
    // CACHE ADMINISTRATION
    // ========================================================================

    pub async fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.get_stats().await
    }

    pub async fn clear_cache(&self) -> Result<usize, ClienteError> {
        let deleted = self.cache.clear_all().await.map_err(|e| {
            warn!(error = %e, "⚠️ Cache flush failed");
            e
        })?;
        self.cache.record(CacheOp::Invalidate).await;
        Ok(deleted)
    }

    // ========================================================================
    // STATS
    // ========================================================================

    fn record_population(&self, source: PopulateSource) {
        match source {
            PopulateSource::Cache => self.record_in_background(CacheOp::Hit),
            PopulateSource::Fetched => {
                self.record_in_background(CacheOp::Miss);
                self.record_in_background(CacheOp::Set);
            }
            PopulateSource::Uncached => self.record_in_background(CacheOp::Miss),
        }
    }

    fn record_in_background(&self, op: CacheOp) {
        let cache = self.cache.clone();
        self.tasks.spawn("cache_stats", async move {
            cache.record(op).await;
            Ok::<_, Infallible>(())
        });
    }
}
