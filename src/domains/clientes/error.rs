use thiserror::Error;

use crate::cache::CacheError;
use crate::db::StoreError;
use crate::models::ClaveError;

/// Which sample body an error response should carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamplePayload {
    Create,
    Update,
}

#[derive(Error, Debug)]
pub enum ClienteError {
    #[error("Datos JSON inválidos")]
    InvalidJson { reason: String, example: ExamplePayload },

    #[error("Clave_Cliente es obligatorio")]
    MissingClave,

    #[error("{0}")]
    InvalidClave(ClaveError),

    #[error("El cliente con Clave_Cliente {0} ya existe")]
    AlreadyExists(String),

    #[error("Cliente no encontrado")]
    NotFound(String),

    #[error("{0} no es un número válido | debe ser un número entero del 1 al 10000")]
    InvalidPage(String),

    #[error("Debe proporcionar al menos un criterio de búsqueda (nombre, email o celular)")]
    MissingSearchCriteria,

    #[error("document store error: {0}")]
    Store(#[from] StoreError),

    /// Only surfaced by administrative cache operations
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<ClaveError> for ClienteError {
    fn from(err: ClaveError) -> Self {
        match err {
            ClaveError::Missing => ClienteError::MissingClave,
            other => ClienteError::InvalidClave(other),
        }
    }
}
