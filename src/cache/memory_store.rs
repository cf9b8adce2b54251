//! In-process implementation of [`CacheStore`].
//!
//! Mirrors the Redis semantics the cache layer relies on (TTL expiry,
//! `SET NX`, sets, atomic batches) so the cache can run without a Redis
//! server in tests and local development.

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::error::CacheError;
use super::store::{CacheStore, PipelineOp};

/// Shortest TTL a write keeps, as `SET EX` cannot take zero
const MIN_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
enum MemValue {
    Bytes(Vec<u8>),
    Members(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct MemEntry {
    value: MemValue,
    expires_at: Option<Instant>,
}

impl MemEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, MemEntry>>,
    unavailable: AtomicBool,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a backend outage: every call fails with `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::StoreUnavailable("memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }

    fn live<'a>(entries: &'a mut HashMap<String, MemEntry>, key: &str, now: Instant) -> Option<&'a mut MemEntry> {
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    fn apply(entries: &mut HashMap<String, MemEntry>, op: PipelineOp, now: Instant) -> Result<(), CacheError> {
        match op {
            PipelineOp::Set { key, value, ttl } => {
                entries.insert(key, MemEntry { value: MemValue::Bytes(value), expires_at: Some(now + ttl.max(MIN_TTL)) });
            }
            PipelineOp::Delete(keys) => {
                for key in keys {
                    entries.remove(&key);
                }
            }
            PipelineOp::Incr(key) => {
                let current = match Self::live(entries, &key, now) {
                    Some(MemEntry { value: MemValue::Bytes(bytes), .. }) => std::str::from_utf8(bytes)
                        .ok()
                        .and_then(|s| s.parse::<i64>().ok())
                        .ok_or_else(|| CacheError::Command(format!("value at {} is not an integer", key)))?,
                    Some(_) => return Err(CacheError::Command(format!("wrong type at {}", key))),
                    None => 0,
                };
                let expires_at = entries.get(&key).and_then(|e| e.expires_at);
                let next = (current + 1).to_string().into_bytes();
                entries.insert(key, MemEntry { value: MemValue::Bytes(next), expires_at });
            }
            PipelineOp::Expire { key, ttl } => {
                if let Some(entry) = Self::live(entries, &key, now) {
                    entry.expires_at = Some(now + ttl.max(MIN_TTL));
                }
            }
            PipelineOp::SetAdd { key, members } => {
                match Self::live(entries, &key, now) {
                    Some(MemEntry { value: MemValue::Members(set), .. }) => set.extend(members),
                    Some(_) => return Err(CacheError::Command(format!("wrong type at {}", key))),
                    None => {
                        let set = members.into_iter().collect();
                        entries.insert(key, MemEntry { value: MemValue::Members(set), expires_at: None });
                    }
                }
            }
            PipelineOp::SetRemove { key, members } => {
                let now_empty = match Self::live(entries, &key, now) {
                    Some(MemEntry { value: MemValue::Members(set), .. }) => {
                        for member in &members {
                            set.remove(member);
                        }
                        set.is_empty()
                    }
                    Some(_) => return Err(CacheError::Command(format!("wrong type at {}", key))),
                    None => false,
                };
                // Redis drops empty sets
                if now_empty {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// Translate a Redis glob (`*`, `?`) into an anchored regex
fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| CacheError::Command(format!("invalid pattern {}: {}", pattern, e)))
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key, Instant::now()) {
            Some(MemEntry { value: MemValue::Bytes(bytes), .. }) => Ok(Some(bytes.clone())),
            Some(_) => Err(CacheError::Command(format!("wrong type at {}", key))),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.pipeline(vec![PipelineOp::Set { key: key.to_string(), value: value.to_vec(), ttl }]).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let mut deleted = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if entry.is_live(now) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Ok(Self::live(&mut entries, key, Instant::now()).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let existed = Self::live(&mut entries, key, now).is_some();
        if ttl.is_zero() {
            entries.remove(key);
        } else {
            Self::apply(&mut entries, PipelineOp::Expire { key: key.to_string(), ttl }, now)?;
        }
        Ok(existed)
    }

    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if Self::live(&mut entries, key, now).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            MemEntry { value: MemValue::Bytes(value.to_vec()), expires_at: Some(now + ttl.max(MIN_TTL)) },
        );
        Ok(true)
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.check_available()?;
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();
        let entries = self.entries.lock();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| entry.is_live(now) && matcher.is_match(key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key, Instant::now()) {
            Some(MemEntry { value: MemValue::Members(set), .. }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(CacheError::Command(format!("wrong type at {}", key))),
            None => Ok(Vec::new()),
        }
    }

    async fn pipeline(&self, ops: Vec<PipelineOp>) -> Result<(), CacheError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        // Apply to a scratch copy so a failing command leaves the store untouched
        let mut staged = entries.clone();
        for op in ops {
            Self::apply(&mut staged, op, now)?;
        }
        *entries = staged;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_and_expire() {
        let store = MemoryCacheStore::new();
        store.set("k", b"v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(store.expire("k", Duration::ZERO).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_batched_zero_ttl_is_clamped() {
        let store = MemoryCacheStore::new();
        store
            .pipeline(vec![
                PipelineOp::Set { key: "page".into(), value: b"v".to_vec(), ttl: Duration::ZERO },
                PipelineOp::SetAdd { key: "idx".into(), members: vec!["1".into()] },
                PipelineOp::Expire { key: "idx".into(), ttl: Duration::ZERO },
            ])
            .await
            .unwrap();
        assert!(store.exists("page").await.unwrap());
        assert_eq!(store.members("idx").await.unwrap(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_set_if_absent_only_once() {
        let store = MemoryCacheStore::new();
        assert!(store.set_if_absent("lock", b"locked", Duration::from_secs(30)).await.unwrap());
        assert!(!store.set_if_absent("lock", b"locked", Duration::from_secs(30)).await.unwrap());
        store.delete(&["lock".to_string()]).await.unwrap();
        assert!(store.set_if_absent("lock", b"locked", Duration::from_secs(30)).await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_matching_glob() {
        let store = MemoryCacheStore::new();
        for key in ["p:cliente:001", "p:cliente:002", "p:clientes_page:1", "p:stats:hit:total"] {
            store.set(key, b"x", Duration::from_secs(60)).await.unwrap();
        }
        let keys = store.keys_matching("p:cliente:*").await.unwrap();
        assert_eq!(keys, vec!["p:cliente:001".to_string(), "p:cliente:002".to_string()]);
        assert_eq!(store.keys_matching("p:*").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_pipeline_incr_and_sets() {
        let store = MemoryCacheStore::new();
        store
            .pipeline(vec![
                PipelineOp::Incr("c".into()),
                PipelineOp::Incr("c".into()),
                PipelineOp::Expire { key: "c".into(), ttl: Duration::from_secs(60) },
                PipelineOp::SetAdd { key: "s".into(), members: vec!["1".into(), "2".into()] },
            ])
            .await
            .unwrap();
        assert_eq!(store.get("c").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.members("s").await.unwrap(), vec!["1".to_string(), "2".to_string()]);

        store
            .pipeline(vec![PipelineOp::SetRemove { key: "s".into(), members: vec!["1".into(), "2".into()] }])
            .await
            .unwrap();
        assert!(!store.exists("s").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_pipeline_is_atomic() {
        let store = MemoryCacheStore::new();
        store.set("text", b"abc", Duration::from_secs(60)).await.unwrap();
        let result = store
            .pipeline(vec![
                PipelineOp::Set { key: "other".into(), value: b"1".to_vec(), ttl: Duration::from_secs(60) },
                PipelineOp::Incr("text".into()),
            ])
            .await;
        assert!(matches!(result, Err(CacheError::Command(_))));
        assert!(!store.exists("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_mode() {
        let store = MemoryCacheStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.get("k").await, Err(CacheError::StoreUnavailable(_))));
        assert!(store.ping().await.is_err());
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
