//! Tick Generator
//!
//! The single background driver that produces a new tick for every
//! symbol once per interval and hands each one to the broadcaster,
//! mirroring it into the cache-aside store on the way.
//!
//! # Lifecycle
//!
//! Stopped -> Running -> Stopped. [`TickGenerator::start`] spawns the
//! interval loop; only one running instance may exist at a time.
//! Cancellation is cooperative: the loop observes its token at the
//! interval boundary and never aborts mid-pass.
//!
//! # Failure isolation
//!
//! Generation is pure arithmetic and cannot fail. Cache mirror
//! failures are logged and swallowed; they never block or abort
//! delivery. Each symbol's step is independent, so no symbol can halt
//! the interval loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{TickCache, tick_cache_key};
use crate::domain::market::{PriceBoard, Tick, round2};
use crate::infrastructure::broadcast::Broadcaster;
use crate::infrastructure::config::GeneratorSettings;
use crate::infrastructure::metrics;

/// Tick generator errors.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// `start` was called while the loop is already running.
    #[error("tick generator is already running")]
    AlreadyRunning,

    /// `start` was called after `stop`; the generator is single-use.
    #[error("tick generator has been stopped")]
    Stopped,
}

/// Interval-driven tick producer. Process-singleton while running.
pub struct TickGenerator {
    board: Arc<PriceBoard>,
    broadcaster: Arc<Broadcaster>,
    cache: Arc<dyn TickCache>,
    settings: GeneratorSettings,
    cancel: CancellationToken,
    running: AtomicBool,
}

impl TickGenerator {
    /// Create a generator over the board, broadcaster, and cache.
    #[must_use]
    pub fn new(
        board: Arc<PriceBoard>,
        broadcaster: Arc<Broadcaster>,
        cache: Arc<dyn TickCache>,
        settings: GeneratorSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            board,
            broadcaster,
            cache,
            settings,
            cancel,
            running: AtomicBool::new(false),
        }
    }

    /// Whether the interval loop is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request the loop to stop at the next interval boundary.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Spawn the interval loop.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::AlreadyRunning`] if the loop is
    /// already running, or [`GeneratorError::Stopped`] if the
    /// generator was stopped; a cancelled token never un-cancels, so a
    /// restarted loop would exit before its first pass.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, GeneratorError> {
        if self.cancel.is_cancelled() {
            return Err(GeneratorError::Stopped);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(GeneratorError::AlreadyRunning);
        }

        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            this.run().await;
        }))
    }

    async fn run(&self) {
        let mut interval = tokio::time::interval(self.settings.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            interval_ms = self.settings.tick_interval.as_millis() as u64,
            symbols = self.board.symbols().len(),
            "tick generator started"
        );

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => self.generate_pass().await,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("tick generator stopped");
    }

    /// One generation pass over the fixed symbol set, in stable order.
    async fn generate_pass(&self) {
        for symbol in self.board.symbols() {
            self.step(symbol).await;
        }
    }

    async fn step(&self, symbol: &str) {
        // The walk continues from the unrounded seed; rounding only the
        // displayed price keeps sub-cent moves accumulating on
        // low-priced symbols.
        let Some(seed) = self.board.seed_price(symbol) else {
            return;
        };

        let (tick, next_seed) = next_tick(symbol, seed);
        self.board.publish(next_seed, tick.clone());

        let tick = Arc::new(tick);
        self.mirror_to_cache(symbol, &tick).await;
        self.broadcaster.deliver(symbol, &tick);
    }

    /// Best-effort cache mirror; failures are logged and swallowed.
    async fn mirror_to_cache(&self, symbol: &str, tick: &Arc<Tick>) {
        let payload = match serde_json::to_string(tick.as_ref()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(symbol, error = %e, "tick serialization failed");
                return;
            }
        };

        if let Err(e) = self
            .cache
            .put(&tick_cache_key(symbol), payload, self.settings.cache_ttl)
            .await
        {
            metrics::record_cache_error("put");
            tracing::error!(symbol, error = %e, "cache mirror failed");
        }
    }
}

/// Compute the next tick from the walk seed: a bounded symmetric
/// random perturbation of at most 2%, with synthetic 24h fields.
///
/// Returns the tick (price rounded to cents) together with the
/// unrounded next seed the following step must continue from.
#[must_use]
pub fn next_tick(symbol: &str, seed: f64) -> (Tick, f64) {
    let mut rng = rand::rng();
    let change = rng.random_range(-0.02..=0.02);
    let next_seed = seed * (1.0 + change);
    let price = round2(next_seed);

    let tick = Tick {
        symbol: symbol.to_string(),
        price,
        change_24h: round2(change * 100.0),
        volume_24h: round2(rng.random_range(1_000_000.0..=10_000_000.0)),
        high_24h: round2(price * 1.05),
        low_24h: round2(price * 0.95),
        timestamp: Utc::now(),
    };
    (tick, next_seed)
}

// =============================================================================
// Tests
// =============================================================================
