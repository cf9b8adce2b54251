//! Centralized TTL constants for caching
//!
//! This module provides consistent cache time-to-live values
//! across the application with environment variable overrides.

use std::env;
use std::time::Duration;

// Default TTL constants (in seconds)
pub const TTL_DEFAULT: u64 = 300; // 5 minutes
pub const TTL_LONG: u64 = 1800; // 30 minutes
pub const TTL_SHORT: u64 = 60; // 1 minute
pub const TTL_LOCK: u64 = 30; // stampede lock safety net
pub const TTL_STATS_DAILY: u64 = 7 * 24 * 3600; // 7 days

/// Get TTL with environment variable override
pub fn ttl_with_env(env_key: &str, default_ttl: u64) -> u64 {
    env::var(env_key)
        .map(|val| val.parse::<u64>().unwrap_or(default_ttl))
        .unwrap_or(default_ttl)
}

/// TTL policy used by the cache layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    /// Pages and freshly written entities
    pub default: Duration,
    /// Entities read back from the document store
    pub long: Duration,
    /// Total document count
    pub short: Duration,
    pub lock: Duration,
    pub stats_daily: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(TTL_DEFAULT),
            long: Duration::from_secs(TTL_LONG),
            short: Duration::from_secs(TTL_SHORT),
            lock: Duration::from_secs(TTL_LOCK),
            stats_daily: Duration::from_secs(TTL_STATS_DAILY),
        }
    }
}

impl CacheTtl {
    /// Load TTLs from environment or defaults
    pub fn from_env() -> Self {
        Self {
            default: Duration::from_secs(ttl_with_env("TTL_DEFAULT_SECONDS", TTL_DEFAULT)),
            long: Duration::from_secs(ttl_with_env("TTL_LONG_SECONDS", TTL_LONG)),
            short: Duration::from_secs(ttl_with_env("TTL_SHORT_SECONDS", TTL_SHORT)),
            lock: Duration::from_secs(ttl_with_env("TTL_LOCK_SECONDS", TTL_LOCK)),
            stats_daily: Duration::from_secs(ttl_with_env("TTL_STATS_SECONDS", TTL_STATS_DAILY)),
        }
    }
}
