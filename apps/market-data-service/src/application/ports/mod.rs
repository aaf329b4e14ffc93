//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`TickCache`]: best-effort cache-aside store for serialized ticks

use std::time::Duration;

use async_trait::async_trait;

/// Errors from the cache-aside store.
///
/// All cache operations are best-effort; callers log these and fall
/// back to the in-memory last-known value. A cache failure must never
/// propagate into the delivery path.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The store is unreachable.
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed the operation.
    #[error("cache operation failed: {0}")]
    Backend(String),
}

/// Best-effort cache-aside store for serialized tick records.
///
/// Keys are per-symbol strings (`market:{SYMBOL}`), values are opaque
/// serialized tick records with a short expiry. The store is never
/// authoritative: core correctness does not depend on it.
#[async_trait]
pub trait TickCache: Send + Sync {
    /// Store a value under a key with the given time-to-live.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Fetch the value for a key, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
}

/// Cache key for a symbol's latest tick.
#[must_use]
pub fn tick_cache_key(symbol: &str) -> String {
    format!("market:{symbol}")
}
