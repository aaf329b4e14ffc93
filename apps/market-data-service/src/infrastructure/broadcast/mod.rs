//! Broadcast Delivery
//!
//! Delivers one tick to every subscriber of a symbol, isolating
//! per-subscriber failures.
//!
//! # Design
//!
//! A delivery pass takes a point-in-time snapshot of the symbol's
//! subscriber set, then attempts one bounded send per subscriber. A
//! full or closed channel marks the subscriber dead; dead subscribers
//! are collected into a removal list and unregistered after the pass,
//! so one unreachable subscriber never stalls delivery to the rest.
//!
//! Per-subscriber FIFO ordering follows from the mpsc channel plus the
//! single generator caller; no ordering is guaranteed across
//! subscribers.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use crate::domain::market::Tick;
use crate::domain::registry::{SubscriberId, TopicRegistry};
use crate::infrastructure::metrics;

/// Outcome of one broadcast pass.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    /// Subscribers that received the tick.
    pub delivered: usize,
    /// Subscribers found unreachable and unregistered.
    pub removed: Vec<SubscriberId>,
}

/// Fans ticks out to the subscribers registered for a symbol.
pub struct Broadcaster {
    registry: Arc<TopicRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over a registry.
    #[must_use]
    pub fn new(registry: Arc<TopicRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver a tick to every current subscriber of its symbol.
    ///
    /// Each subscriber gets exactly one send attempt; failures are
    /// never retried within the pass. Unreachable subscribers are
    /// unregistered after the pass.
    pub fn deliver(&self, symbol: &str, tick: &Arc<Tick>) -> DeliveryReport {
        let snapshot = self.registry.snapshot(symbol);
        if snapshot.is_empty() {
            return DeliveryReport::default();
        }

        let mut delivered = 0usize;
        let mut removed = Vec::new();

        for (id, sender) in snapshot {
            match sender.try_send(Arc::clone(tick)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(symbol, id, "subscriber channel full, dropping subscriber");
                    removed.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(symbol, id, "subscriber channel closed");
                    removed.push(id);
                }
            }
        }

        for id in &removed {
            self.registry.unregister(symbol, *id);
        }

        if delivered > 0 {
            metrics::record_ticks_delivered(symbol, delivered as u64);
        }

        DeliveryReport { delivered, removed }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::registry::next_subscriber_id;

    fn setup() -> (Arc<TopicRegistry>, Broadcaster) {
        let registry = Arc::new(TopicRegistry::new(&["BTC".to_string(), "ETH".to_string()]));
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        (registry, broadcaster)
    }

    fn tick(symbol: &str) -> Arc<Tick> {
        Arc::new(Tick::seed(symbol, 100.0))
    }

    #[tokio::test]
    async fn delivers_to_all_subscribers() {
        let (registry, broadcaster) = setup();

        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.register("BTC", 1, tx1);
        registry.register("BTC", 2, tx2);

        let report = broadcaster.deliver("BTC", &tick("BTC"));
        assert_eq!(report.delivered, 2);
        assert!(report.removed.is_empty());

        assert_eq!(rx1.recv().await.unwrap().symbol, "BTC");
        assert_eq!(rx2.recv().await.unwrap().symbol, "BTC");
    }

    #[tokio::test]
    async fn closed_subscriber_is_removed_others_still_receive() {
        let (registry, broadcaster) = setup();

        let (tx_live, mut rx_live) = mpsc::channel(8);
        let (tx_dead, rx_dead) = mpsc::channel::<Arc<Tick>>(8);
        registry.register("BTC", 1, tx_live);
        registry.register("BTC", 2, tx_dead);
        drop(rx_dead);

        let report = broadcaster.deliver("BTC", &tick("BTC"));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.removed, vec![2]);

        assert!(rx_live.recv().await.is_some());
        assert_eq!(registry.subscriber_count("BTC"), 1);
    }

    #[tokio::test]
    async fn full_channel_counts_as_unreachable() {
        let (registry, broadcaster) = setup();

        let (tx, _rx) = mpsc::channel(1);
        registry.register("BTC", 1, tx);

        let first = broadcaster.deliver("BTC", &tick("BTC"));
        assert_eq!(first.delivered, 1);

        // Receiver never drains; the second pass finds the channel full.
        let second = broadcaster.deliver("BTC", &tick("BTC"));
        assert_eq!(second.delivered, 0);
        assert_eq!(second.removed, vec![1]);
        assert_eq!(registry.subscriber_count("BTC"), 0);
    }

    #[tokio::test]
    async fn delivery_scoped_to_symbol() {
        let (registry, broadcaster) = setup();

        let (tx_btc, mut rx_btc) = mpsc::channel(8);
        let (tx_eth, mut rx_eth) = mpsc::channel(8);
        registry.register("BTC", 1, tx_btc);
        registry.register("ETH", 2, tx_eth);

        let report = broadcaster.deliver("BTC", &tick("BTC"));
        assert_eq!(report.delivered, 1);

        assert!(rx_btc.recv().await.is_some());
        assert!(rx_eth.try_recv().is_err());
    }

    #[tokio::test]
    async fn no_subscribers_is_empty_report() {
        let (_registry, broadcaster) = setup();

        let report = broadcaster.deliver("BTC", &tick("BTC"));
        assert_eq!(report.delivered, 0);
        assert!(report.removed.is_empty());
    }

    #[tokio::test]
    async fn successive_passes_preserve_per_subscriber_order() {
        let (registry, broadcaster) = setup();

        let (tx, mut rx) = mpsc::channel(16);
        registry.register("BTC", 1, tx);

        for i in 0..5u32 {
            let mut t = Tick::seed("BTC", 100.0);
            t.price = f64::from(i);
            broadcaster.deliver("BTC", &Arc::new(t));
        }

        for i in 0..5u32 {
            let received = rx.recv().await.unwrap();
            assert_eq!(received.price, f64::from(i));
        }
    }

    #[tokio::test]
    async fn thousand_subscribers_one_dead() {
        let (registry, broadcaster) = setup();

        let mut receivers = Vec::new();
        for _ in 0..999 {
            let (tx, rx) = mpsc::channel(8);
            registry.register("BTC", next_subscriber_id(), tx);
            receivers.push(rx);
        }
        let dead_id = next_subscriber_id();
        let (tx_dead, rx_dead) = mpsc::channel::<Arc<Tick>>(8);
        registry.register("BTC", dead_id, tx_dead);
        drop(rx_dead);

        let report = broadcaster.deliver("BTC", &tick("BTC"));
        assert_eq!(report.delivered, 999);
        assert_eq!(report.removed, vec![dead_id]);
        assert_eq!(registry.subscriber_count("BTC"), 999);

        for rx in &mut receivers {
            assert!(rx.try_recv().is_ok());
        }
    }
}
