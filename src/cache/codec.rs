// ============================================================================
// ENTRY CODEC - JSON envelope for cached payloads
// ============================================================================

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::CacheError;
use super::store::CacheStore;

/// Left under an entity key by a delete so a late miss-fill cannot bring the
/// record back. Reads as a miss and is never evicted as corrupt.
pub const TOMBSTONE: &[u8] = b"{\"tombstone\":true}";

/// Metadata stored next to a cached payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub page: Option<u32>,
    /// Unix seconds
    pub cached_at: i64,
}

impl EntryMeta {
    pub fn now() -> Self {
        Self { count: None, page: None, cached_at: Utc::now().timestamp() }
    }

    pub fn for_page(page: u32, count: usize) -> Self {
        Self { count: Some(count), page: Some(page), ..Self::now() }
    }
}

/// Self-describing cache payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub meta: Option<EntryMeta>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, meta: EntryMeta) -> Self {
        Self { data, meta: Some(meta) }
    }
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CacheError> {
    serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Decode a payload read from `key`
pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, CacheError> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::CorruptEntry {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub fn encode_entry<T: Serialize>(data: &T, meta: EntryMeta) -> Result<Vec<u8>, CacheError> {
    #[derive(Serialize)]
    struct Borrowed<'a, T> {
        data: &'a T,
        meta: EntryMeta,
    }
    encode(&Borrowed { data, meta })
}

pub fn decode_entry<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<CacheEntry<T>, CacheError> {
    decode(key, bytes)
}

/// Cached value under `key`. Outages, absent keys and tombstones read as
/// `None`; corrupt payloads are deleted and read as `None` too.
pub async fn read_or_evict<T: DeserializeOwned>(store: &dyn CacheStore, key: &str) -> Option<T> {
    let bytes = match store.get(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            debug!(key = %key, error = %e, "Cache read failed, treating as miss");
            return None;
        }
    };
    if bytes == TOMBSTONE {
        return None;
    }

    match decode_entry::<T>(key, &bytes) {
        Ok(entry) => Some(entry.data),
        Err(e) => {
            warn!(key = %key, error = %e, "🧹 Dropping corrupt cache entry");
            if let Err(e) = store.delete(&[key.to_string()]).await {
                debug!(key = %key, error = %e, "Could not delete corrupt entry");
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: String,
        name: String,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("not serializable"))
        }
    }

    #[test]
    fn test_entry_keeps_payload_and_meta() {
        let sample = Sample { id: "007".into(), name: "Ana".into() };
        let bytes = encode_entry(&sample, EntryMeta::for_page(2, 1)).unwrap();
        let entry: CacheEntry<Sample> = decode_entry("k", &bytes).unwrap();
        assert_eq!(entry.data, sample);
        let meta = entry.meta.unwrap();
        assert_eq!(meta.page, Some(2));
        assert_eq!(meta.count, Some(1));
    }

    #[test]
    fn test_corrupt_payload_is_reported_with_key() {
        let err = decode_entry::<Sample>("api:cliente:007", b"{not json").unwrap_err();
        match err {
            CacheError::CorruptEntry { key, .. } => assert_eq!(key, "api:cliente:007"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_shape_is_corrupt() {
        let bytes = encode(&HashMap::from([("unexpected", 1)])).unwrap();
        assert!(matches!(decode_entry::<Sample>("k", &bytes), Err(CacheError::CorruptEntry { .. })));
    }

    #[tokio::test]
    async fn test_read_or_evict_keeps_tombstones_and_drops_garbage() {
        use crate::cache::memory_store::MemoryCacheStore;
        use std::time::Duration;

        let store = MemoryCacheStore::new();
        store.set("k:dead", TOMBSTONE, Duration::from_secs(60)).await.unwrap();
        store.set("k:bad", b"{nope", Duration::from_secs(60)).await.unwrap();

        assert_eq!(read_or_evict::<Sample>(&store, "k:dead").await, None);
        assert!(store.exists("k:dead").await.unwrap());
        assert_eq!(read_or_evict::<Sample>(&store, "k:bad").await, None);
        assert!(!store.exists("k:bad").await.unwrap());
    }

    #[test]
    fn test_serialization_failure_does_not_panic() {
        let err = encode(&Unserializable).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
