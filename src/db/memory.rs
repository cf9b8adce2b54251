use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ClienteStore, StoreError};
use crate::models::{Cliente, ClienteCambios, Errores, FiltroBusqueda};

/// In-process store ordered by clave, for tests and local runs
#[derive(Default)]
pub struct MemoryClienteStore {
    clientes: RwLock<BTreeMap<String, Cliente>>,
    unavailable: AtomicBool,
}

impl MemoryClienteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a database outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

fn matches(cliente: &Cliente, filtro: &FiltroBusqueda) -> bool {
    let contains = |haystack: &str, needle: &str| haystack.to_lowercase().contains(&needle.to_lowercase());
    filtro.nombre.as_deref().map_or(true, |n| contains(&cliente.nombre, n))
        && filtro.email.as_deref().map_or(true, |e| contains(&cliente.email, e))
        && filtro.celular.as_deref().map_or(true, |c| cliente.celular == c)
}

#[async_trait]
impl ClienteStore for MemoryClienteStore {
    async fn find_by_clave(&self, clave: &str) -> Result<Option<Cliente>, StoreError> {
        self.check_available()?;
        Ok(self.clientes.read().get(clave).cloned())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self.clientes.read().len() as u64)
    }

    async fn find_page(&self, skip: u64, limit: u32) -> Result<Vec<Cliente>, StoreError> {
        self.check_available()?;
        Ok(self
            .clientes
            .read()
            .values()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn insert(&self, cliente: &Cliente) -> Result<(), StoreError> {
        self.check_available()?;
        let mut clientes = self.clientes.write();
        if clientes.contains_key(&cliente.clave_cliente) {
            return Err(StoreError::Duplicate(cliente.clave_cliente.clone()));
        }
        clientes.insert(cliente.clave_cliente.clone(), cliente.clone());
        Ok(())
    }

    async fn update(
        &self,
        clave: &str,
        cambios: &ClienteCambios,
        errores: Option<&Errores>,
    ) -> Result<Option<Cliente>, StoreError> {
        self.check_available()?;
        let mut clientes = self.clientes.write();
        Ok(clientes.get_mut(clave).map(|cliente| {
            cliente.nombre = cambios.nombre.clone();
            cliente.celular = cambios.celular.clone();
            cliente.email = cambios.email.clone();
            cliente.errores = errores.cloned();
            cliente.clone()
        }))
    }

    async fn delete(&self, clave: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.clientes.write().remove(clave).is_some())
    }

    async fn search(&self, filtro: &FiltroBusqueda, limit: u32) -> Result<(Vec<Cliente>, u64), StoreError> {
        self.check_available()?;
        let clientes = self.clientes.read();
        let found: Vec<&Cliente> = clientes.values().filter(|c| matches(c, filtro)).collect();
        let total = found.len() as u64;
        Ok((found.into_iter().take(limit as usize).cloned().collect(), total))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
