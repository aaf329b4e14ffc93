//! Market Data Types
//!
//! Core domain types for simulated cryptocurrency market data: the fixed
//! symbol universe, the tick record, and the last-known-value board.
//!
//! # Design
//!
//! The symbol universe is fixed at process start; no dynamic symbol
//! creation. The `PriceBoard` holds the last generated tick per symbol
//! with a single writer (the tick generator) and many readers (REST
//! fallback, new-session snapshot push). Staleness by one interval is
//! acceptable, so readers take only a short read lock.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// A symbol string (crypto instrument ticker, e.g. "BTC").
pub type Symbol = String;

/// Default symbol universe with seed prices.
pub const SEED_PRICES: &[(&str, f64)] = &[
    ("BTC", 45_000.0),
    ("ETH", 3_000.0),
    ("SOL", 100.0),
    ("MATIC", 0.80),
    ("AVAX", 35.0),
];

/// One generated market data record for a symbol at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument symbol.
    pub symbol: String,
    /// Last price.
    pub price: f64,
    /// 24h change, percent.
    pub change_24h: f64,
    /// 24h traded volume.
    pub volume_24h: f64,
    /// 24h high.
    pub high_24h: f64,
    /// 24h low.
    pub low_24h: f64,
    /// Generation time (UTC, RFC 3339 on the wire).
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    /// Build the initial tick for a symbol before the generator has run.
    ///
    /// Matches the shape served by the REST fallback: seed price with
    /// zeroed change and volume, high/low pinned to the price.
    #[must_use]
    pub fn seed(symbol: &str, price: f64) -> Self {
        let price = round2(price);
        Self {
            symbol: symbol.to_string(),
            price,
            change_24h: 0.0,
            volume_24h: 0.0,
            high_24h: price,
            low_24h: price,
            timestamp: Utc::now(),
        }
    }
}

/// Round to two decimal places, as quoted prices are.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Price Board
// =============================================================================

/// Last-known tick per symbol, plus the fixed symbol universe.
///
/// Seeded at construction so every known symbol always has a value to
/// serve, even before the first generator pass. The generator is the
/// only writer; values are monotonically replaced, never rolled back.
///
/// Each symbol keeps an unrounded walk seed alongside its displayed
/// tick. The random walk continues from the seed, not the cent-rounded
/// price, so sub-cent moves on low-priced symbols accumulate instead
/// of rounding away.
pub struct PriceBoard {
    symbols: Vec<Symbol>,
    slots: RwLock<HashMap<Symbol, Slot>>,
}

struct Slot {
    seed: f64,
    tick: Tick,
}

impl PriceBoard {
    /// Create a board over the default symbol universe.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seeds(SEED_PRICES)
    }

    /// Create a board over a custom symbol universe.
    #[must_use]
    pub fn with_seeds(seeds: &[(&str, f64)]) -> Self {
        let symbols: Vec<Symbol> = seeds.iter().map(|(s, _)| (*s).to_string()).collect();
        let slots = seeds
            .iter()
            .map(|(s, p)| {
                let slot = Slot {
                    seed: *p,
                    tick: Tick::seed(s, *p),
                };
                ((*s).to_string(), slot)
            })
            .collect();
        Self {
            symbols,
            slots: RwLock::new(slots),
        }
    }

    /// The fixed symbol universe, in stable generation order.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Check whether a symbol is part of the universe.
    #[must_use]
    pub fn is_known(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// Last known tick for a symbol, or `None` if the symbol is unknown.
    #[must_use]
    pub fn last(&self, symbol: &str) -> Option<Tick> {
        self.slots.read().get(symbol).map(|slot| slot.tick.clone())
    }

    /// Unrounded walk seed for a symbol, or `None` if unknown.
    #[must_use]
    pub fn seed_price(&self, symbol: &str) -> Option<f64> {
        self.slots.read().get(symbol).map(|slot| slot.seed)
    }

    /// Replace the walk seed and last known tick for the tick's symbol.
    ///
    /// Single-writer: only the tick generator calls this.
    pub fn publish(&self, seed: f64, tick: Tick) {
        self.slots
            .write()
            .insert(tick.symbol.clone(), Slot { seed, tick });
    }
}

impl Default for PriceBoard {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
