//! Application Services
//!
//! `MarketService` is the snapshot-query facade used by the REST
//! endpoints and by a session's initial push: cache-if-fresh, else the
//! board's last known value. Both consumers go through the same code
//! path so they can never diverge.

use std::sync::Arc;

use crate::application::ports::{TickCache, tick_cache_key};
use crate::domain::market::{PriceBoard, Symbol, Tick};

/// Snapshot queries and symbol discovery over the board and the cache.
pub struct MarketService {
    board: Arc<PriceBoard>,
    cache: Arc<dyn TickCache>,
}

impl MarketService {
    /// Create a service over a board and a cache adapter.
    #[must_use]
    pub fn new(board: Arc<PriceBoard>, cache: Arc<dyn TickCache>) -> Self {
        Self { board, cache }
    }

    /// The fixed symbol universe, in stable order.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        self.board.symbols()
    }

    /// Check whether a symbol is part of the universe.
    #[must_use]
    pub fn is_known(&self, symbol: &str) -> bool {
        self.board.is_known(symbol)
    }

    /// Last known tick for a symbol: cache if present and fresh, else
    /// the board. `None` only for unknown symbols.
    ///
    /// Cache failures and undecodable entries are treated as misses;
    /// the board always has a value for known symbols.
    pub async fn snapshot(&self, symbol: &str) -> Option<Tick> {
        if !self.board.is_known(symbol) {
            return None;
        }

        match self.cache.get(&tick_cache_key(symbol)).await {
            Ok(Some(raw)) => match serde_json::from_str::<Tick>(&raw) {
                Ok(tick) => return Some(tick),
                Err(e) => {
                    tracing::debug!(symbol, error = %e, "undecodable cache entry, falling back");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::error!(symbol, error = %e, "cache read failed, falling back");
            }
        }

        self.board.last(symbol)
    }

    /// Snapshots for every symbol, in stable order.
    pub async fn all_snapshots(&self) -> Vec<Tick> {
        let mut ticks = Vec::with_capacity(self.board.symbols().len());
        for symbol in self.board.symbols() {
            if let Some(tick) = self.snapshot(symbol).await {
                ticks.push(tick);
            }
        }
        ticks
    }
}

// =============================================================================
// Tests
// =============================================================================
