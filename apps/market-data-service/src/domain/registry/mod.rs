//! Topic Registry
//!
//! Tracks the set of live subscriber channels per symbol for broadcast
//! fan-out.
//!
//! # Design
//!
//! The registry holds one subscriber set per symbol of the fixed
//! universe. Sessions register on admission and unregister on
//! disconnect; the broadcaster takes a copy-on-read snapshot per
//! delivery pass so that slow deliveries never hold the lock and never
//! block new subscribers. A subscriber that was removed between
//! snapshot and send simply fails its send attempt and is unregistered
//! again (idempotent).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::domain::market::{Symbol, Tick};

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a subscriber session.
pub type SubscriberId = u64;

/// Outbound delivery channel for one subscriber.
///
/// Bounded: a subscriber whose channel is full beyond capacity is
/// treated as unreachable rather than allowed to stall the pass.
pub type TickSender = mpsc::Sender<Arc<Tick>>;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique subscriber id.
#[must_use]
pub fn next_subscriber_id() -> SubscriberId {
    NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed)
}

// =============================================================================
// Topic Registry
// =============================================================================

/// Per-symbol subscriber sets with concurrency-safe join/leave/snapshot.
///
/// The symbol set is fixed at construction; registering under an
/// unknown symbol is a logged no-op (admission validates symbols before
/// registration is attempted).
///
/// # Example
///
/// ```rust
/// use market_data_service::domain::registry::{TopicRegistry, next_subscriber_id};
///
/// let registry = TopicRegistry::new(&["BTC".to_string()]);
/// let (tx, _rx) = tokio::sync::mpsc::channel(8);
///
/// let id = next_subscriber_id();
/// registry.register("BTC", id, tx);
/// assert_eq!(registry.subscriber_count("BTC"), 1);
///
/// registry.unregister("BTC", id);
/// assert_eq!(registry.subscriber_count("BTC"), 0);
/// ```
pub struct TopicRegistry {
    topics: RwLock<HashMap<Symbol, HashMap<SubscriberId, TickSender>>>,
}

impl TopicRegistry {
    /// Create a registry over a fixed symbol set.
    #[must_use]
    pub fn new(symbols: &[Symbol]) -> Self {
        let topics = symbols
            .iter()
            .map(|s| (s.clone(), HashMap::new()))
            .collect();
        Self {
            topics: RwLock::new(topics),
        }
    }

    /// Add a subscriber to a symbol's set.
    ///
    /// No-op for symbols outside the fixed set.
    pub fn register(&self, symbol: &str, id: SubscriberId, sender: TickSender) {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(symbol) else {
            tracing::warn!(symbol, id, "register for unknown symbol ignored");
            return;
        };
        subscribers.insert(id, sender);
        let total = subscribers.len();
        drop(topics);
        tracing::info!(symbol, id, total, "subscriber registered");
    }

    /// Remove a subscriber from a symbol's set.
    ///
    /// Idempotent: removing an absent subscriber is not an error.
    pub fn unregister(&self, symbol: &str, id: SubscriberId) {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(symbol) else {
            return;
        };
        if subscribers.remove(&id).is_some() {
            let total = subscribers.len();
            drop(topics);
            tracing::info!(symbol, id, total, "subscriber unregistered");
        }
    }

    /// Point-in-time copy of a symbol's subscriber set.
    ///
    /// The read lock is held only for the clone, not for delivery.
    #[must_use]
    pub fn snapshot(&self, symbol: &str) -> Vec<(SubscriberId, TickSender)> {
        self.topics
            .read()
            .get(symbol)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of subscribers currently registered for a symbol.
    #[must_use]
    pub fn subscriber_count(&self, symbol: &str) -> usize {
        self.topics.read().get(symbol).map_or(0, HashMap::len)
    }

    /// Registry-wide statistics for health reporting.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let topics = self.topics.read();
        RegistryStats {
            topics: topics.len(),
            subscribers: topics.values().map(HashMap::len).sum(),
        }
    }
}

/// Registry-wide statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryStats {
    /// Number of symbols in the fixed set.
    pub topics: usize,
    /// Total subscribers across all symbols.
    pub subscribers: usize,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TopicRegistry {
        TopicRegistry::new(&["BTC".to_string(), "ETH".to_string()])
    }

    fn sender() -> TickSender {
        mpsc::channel(8).0
    }

    #[test]
    fn register_adds_subscriber() {
        let reg = registry();
        reg.register("BTC", 1, sender());

        assert_eq!(reg.subscriber_count("BTC"), 1);
        assert_eq!(reg.subscriber_count("ETH"), 0);
    }

    #[test]
    fn register_unknown_symbol_is_noop() {
        let reg = registry();
        reg.register("DOGE", 1, sender());

        assert_eq!(reg.stats().subscribers, 0);
    }

    #[test]
    fn unregister_removes_subscriber() {
        let reg = registry();
        reg.register("BTC", 1, sender());
        reg.unregister("BTC", 1);

        assert_eq!(reg.subscriber_count("BTC"), 0);
    }

    #[test]
    fn unregister_is_idempotent() {
        let reg = registry();
        reg.register("BTC", 1, sender());

        reg.unregister("BTC", 1);
        reg.unregister("BTC", 1);
        reg.unregister("ETH", 42);
        reg.unregister("DOGE", 42);

        assert_eq!(reg.subscriber_count("BTC"), 0);
    }

    #[test]
    fn snapshot_is_point_in_time_copy() {
        let reg = registry();
        reg.register("BTC", 1, sender());
        reg.register("BTC", 2, sender());

        let snap = reg.snapshot("BTC");
        assert_eq!(snap.len(), 2);

        // Mutations after the snapshot do not affect it.
        reg.unregister("BTC", 1);
        assert_eq!(snap.len(), 2);
        assert_eq!(reg.subscriber_count("BTC"), 1);
    }

    #[test]
    fn snapshot_unknown_symbol_is_empty() {
        let reg = registry();
        assert!(reg.snapshot("DOGE").is_empty());
    }

    #[test]
    fn subscriber_ids_are_unique() {
        let a = next_subscriber_id();
        let b = next_subscriber_id();
        assert_ne!(a, b);
    }

    #[test]
    fn stats_count_all_topics() {
        let reg = registry();
        reg.register("BTC", 1, sender());
        reg.register("BTC", 2, sender());
        reg.register("ETH", 3, sender());

        let stats = reg.stats();
        assert_eq!(stats.topics, 2);
        assert_eq!(stats.subscribers, 3);
    }

    #[test]
    fn thread_safety_concurrent_register_unregister() {
        use std::thread;

        let reg = Arc::new(TopicRegistry::new(&["BTC".to_string()]));
        let mut handles = vec![];

        for i in 0..16u64 {
            let r = Arc::clone(&reg);
            handles.push(thread::spawn(move || {
                let tx = mpsc::channel(8).0;
                r.register("BTC", i, tx);
                if i % 2 == 0 {
                    r.unregister("BTC", i);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // Odd ids stay registered.
        assert_eq!(reg.subscriber_count("BTC"), 8);
    }
}
