//! Time-bounded store of raw upstream result sets.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Fixture schedules rarely move intraday.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longer TTLs are clamped to this; an unbounded one would overflow `Instant`.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Raw, pre-normalization provider records. Shared, never mutated once cached.
pub type Payload = Arc<Vec<Value>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub sport: String,
    pub window_start: NaiveDate,
    pub days: u32,
}

impl CacheKey {
    pub fn new(sport: impl Into<String>, window_start: NaiveDate, days: u32) -> Self {
        Self { sport: sport.into(), window_start, days }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Cache backend. Callers treat any error as a miss.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Payload>, CacheError>;

    /// Replace the entry for `key` wholesale. Last writer wins.
    async fn set(&self, key: CacheKey, payload: Payload, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Payload,
    expires_at: Instant,
}

/// Process-local cache. Expired entries are ignored on read and swept out on
/// every write, so the map only holds live windows.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Payload>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| Instant::now() <= entry.expires_at)
            .map(|entry| Arc::clone(&entry.payload)))
    }

    async fn set(&self, key: CacheKey, payload: Payload, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now + ttl.min(MAX_TTL);
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| now <= entry.expires_at);
        entries.insert(key, CacheEntry { payload, expires_at });
        Ok(())
    }
}

/// A cache that is never there. Every lookup misses; writes are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl ResultCache for NoCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<Payload>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: CacheKey, _payload: Payload, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(sport: &str) -> CacheKey {
        CacheKey::new(sport, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), 3)
    }

    #[tokio::test(start_paused = true)]
    async fn set_then_get_returns_payload_until_ttl_elapses() {
        let cache = MemoryCache::new();
        let payload: Payload = Arc::new(vec![json!({ "id": 1 }), json!({ "id": 2 })]);
        let ttl = Duration::from_secs(60);

        cache.set(key("soccer"), Arc::clone(&payload), ttl).await.unwrap();
        assert_eq!(cache.get(&key("soccer")).await.unwrap(), Some(Arc::clone(&payload)));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get(&key("soccer")).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&key("soccer")).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_expired_windows() {
        let cache = MemoryCache::new();
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        for offset in 0..30 {
            let window = CacheKey::new("soccer", start + chrono::Days::new(offset), 3);
            cache.set(window, Arc::new(vec![json!(offset)]), Duration::from_secs(1)).await.unwrap();
            tokio::time::advance(Duration::from_secs(2)).await;
        }
        assert_eq!(cache.len().await, 1);

        // Live entries survive a sweep.
        cache.set(key("mma"), Arc::new(Vec::new()), DEFAULT_TTL).await.unwrap();
        cache.set(key("basketball"), Arc::new(Vec::new()), DEFAULT_TTL).await.unwrap();
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_ttl_is_clamped() {
        let cache = MemoryCache::new();
        cache.set(key("soccer"), Arc::new(vec![json!(1)]), Duration::from_secs(u64::MAX)).await.unwrap();
        tokio::time::advance(Duration::from_secs(30 * 24 * 60 * 60)).await;
        assert!(cache.get(&key("soccer")).await.unwrap().is_some());

        tokio::time::advance(MAX_TTL).await;
        assert_eq!(cache.get(&key("soccer")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_result_is_a_cache_hit() {
        let cache = MemoryCache::new();
        cache.set(key("mma"), Arc::new(Vec::new()), DEFAULT_TTL).await.unwrap();
        let hit = cache.get(&key("mma")).await.unwrap();
        assert_eq!(hit.map(|p| p.len()), Some(0));
    }

    #[tokio::test]
    async fn keys_are_isolated_and_writes_replace() {
        let cache = MemoryCache::new();
        cache.set(key("soccer"), Arc::new(vec![json!(1)]), DEFAULT_TTL).await.unwrap();
        assert_eq!(cache.get(&key("basketball")).await.unwrap(), None);

        let other_window = CacheKey::new("soccer", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), 3);
        assert_eq!(cache.get(&other_window).await.unwrap(), None);

        cache.set(key("soccer"), Arc::new(vec![json!(2), json!(3)]), DEFAULT_TTL).await.unwrap();
        let payload = cache.get(&key("soccer")).await.unwrap().unwrap();
        assert_eq!(*payload, vec![json!(2), json!(3)]);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn no_cache_always_misses() {
        let cache = NoCache;
        cache.set(key("soccer"), Arc::new(vec![json!(1)]), DEFAULT_TTL).await.unwrap();
        assert_eq!(cache.get(&key("soccer")).await.unwrap(), None);
    }
}
