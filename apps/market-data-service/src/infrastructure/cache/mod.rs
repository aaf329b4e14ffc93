//! Cache-Aside Adapter
//!
//! In-process implementation of the [`TickCache`] port: a TTL map
//! guarded by a mutex. Serves the same role as an external key-value
//! store for single-process deployments; a networked adapter would
//! implement the same port.
//!
//! Entries expire lazily: reads check the deadline, writes sweep
//! anything already past it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::application::ports::{CacheError, TickCache};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// TTL map implementation of the cache-aside port.
#[derive(Default)]
pub struct MemoryTickCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryTickCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    /// Whether the cache holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TickCache for MemoryTickCache {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_absent_key_is_none() {
        let cache = MemoryTickCache::new();
        assert!(cache.get("market:BTC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let cache = MemoryTickCache::new();
        cache
            .put("market:BTC", "payload".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let value = cache.get("market:BTC").await.unwrap();
        assert_eq!(value.as_deref(), Some("payload"));
    }

    #[tokio::test]
    async fn put_overwrites_existing_entry() {
        let cache = MemoryTickCache::new();
        cache
            .put("k", "old".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .put("k", "new".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryTickCache::new();
        cache
            .put("market:BTC", "payload".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("market:BTC").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("market:BTC").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn put_sweeps_expired_entries() {
        let cache = MemoryTickCache::new();
        cache
            .put("stale", "x".to_string(), Duration::from_secs(1))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        cache
            .put("fresh", "y".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let entries = cache.entries.lock();
        assert!(!entries.contains_key("stale"));
        assert!(entries.contains_key("fresh"));
    }
}
