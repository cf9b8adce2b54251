// ============================================================================
// DOCUMENT STORE - Authoritative storage for clientes
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Cliente, ClienteCambios, Errores, FiltroBusqueda};

pub mod memory;
pub mod postgres;

pub use memory::MemoryClienteStore;
pub use postgres::PgClienteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cliente {0} already exists")]
    Duplicate(String),

    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ClienteStore: Send + Sync {
    async fn find_by_clave(&self, clave: &str) -> Result<Option<Cliente>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Ordered by `Clave_Cliente` ascending
    async fn find_page(&self, skip: u64, limit: u32) -> Result<Vec<Cliente>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the clave is taken
    async fn insert(&self, cliente: &Cliente) -> Result<(), StoreError>;

    /// Replaces the editable fields; `None` when no record has this clave
    async fn update(
        &self,
        clave: &str,
        cambios: &ClienteCambios,
        errores: Option<&Errores>,
    ) -> Result<Option<Cliente>, StoreError>;

    /// True when a record was removed
    async fn delete(&self, clave: &str) -> Result<bool, StoreError>;

    /// Case-insensitive substring match on name and email, exact phone.
    /// Returns at most `limit` items plus the total number of matches.
    async fn search(&self, filtro: &FiltroBusqueda, limit: u32) -> Result<(Vec<Cliente>, u64), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
