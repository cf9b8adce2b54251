use std::time::Duration;
use thiserror::Error;

// ============================================================================
// CACHE ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("cache operation `{op}` timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("cache command failed: {0}")]
    Command(String),

    #[error("corrupt cache entry at {key}: {reason}")]
    CorruptEntry { key: String, reason: String },

    #[error("value cannot be serialized for caching: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Errors that mean the backend could not serve the request at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::StoreUnavailable(_) | CacheError::Timeout { .. })
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            CacheError::StoreUnavailable(err.to_string())
        } else {
            CacheError::Command(err.to_string())
        }
    }
}

/// Failure of a stampede-guarded population
#[derive(Error, Debug)]
pub enum PopulateError<E> {
    #[error("fetch failed: {0}")]
    Fetch(E),

    #[error("another caller is populating {key} and no cached value appeared")]
    LockContention { key: String },
}
