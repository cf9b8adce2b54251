//! Cache key generation utilities
//!
//! This module provides consistent cache key generation
//! across the application for the different cached entry types.

use std::fmt;

/// Default namespace prefix for every key written by this service
pub const DEFAULT_KEY_PREFIX: &str = "api_compiladores:";

const LOCK_SUFFIX: &str = ":lock";
const PAGE_INDEX_ID: &str = "index";
const TOTAL_COUNT_ID: &str = "total_clientes";

/// Kind of entry stored in the cache. Tags never contain `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Cliente,
    ClientesPage,
    Stats,
}

impl EntryType {
    pub fn tag(&self) -> &'static str {
        match self {
            EntryType::Cliente => "cliente",
            EntryType::ClientesPage => "clientes_page",
            EntryType::Stats => "stats",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Builds namespaced keys of the form `<prefix><tag>:<identifier>`.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    prefix: String,
}

impl Default for CacheKeyBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl CacheKeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Generate the key for an entry type and identifier
    pub fn build_key(&self, entry_type: EntryType, identifier: &str) -> String {
        format!("{}{}:{}", self.prefix, entry_type.tag(), identifier)
    }

    /// Generate cache key for a single cliente by its normalized clave
    pub fn entity_key(&self, clave: &str) -> String {
        self.build_key(EntryType::Cliente, clave)
    }

    /// Generate cache key for a page of the cliente list
    pub fn page_key(&self, page: u32) -> String {
        self.build_key(EntryType::ClientesPage, &page.to_string())
    }

    /// Set holding the page numbers currently cached
    pub fn page_index_key(&self) -> String {
        self.build_key(EntryType::ClientesPage, PAGE_INDEX_ID)
    }

    /// Stampede lock guarding the population of `key`
    pub fn lock_key(&self, key: &str) -> String {
        format!("{}{}", key, LOCK_SUFFIX)
    }

    /// Cached document count
    pub fn total_count_key(&self) -> String {
        self.build_key(EntryType::Stats, TOTAL_COUNT_ID)
    }

    /// Daily counter for a stats operation (`date` is `YYYY-MM-DD`)
    pub fn stats_daily_key(&self, op: &str, date: &str) -> String {
        self.build_key(EntryType::Stats, &format!("{}:{}", op, date))
    }

    /// All-time counter for a stats operation
    pub fn stats_total_key(&self, op: &str) -> String {
        self.build_key(EntryType::Stats, &format!("{}:total", op))
    }

    /// Glob matching every key of an entry type
    pub fn pattern(&self, entry_type: EntryType) -> String {
        self.build_key(entry_type, "*")
    }
}
