#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::cast_precision_loss,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Market Data Service - Real-time Crypto Tick Streamer
//!
//! Generates simulated cryptocurrency price ticks once per interval and
//! fans them out to WebSocket subscribers per symbol, with a
//! best-effort cache-aside layer and REST snapshot endpoints.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core market data types and the fan-out registry
//!   - `market`: Symbols, ticks, the last-known-value board
//!   - `registry`: Per-symbol subscriber sets
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Cache-aside store interface
//!   - `services`: Snapshot queries used by REST and sessions
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `generator`: Interval-driven tick production
//!   - `broadcast`: Per-pass delivery with failure isolation
//!   - `cache`: In-process TTL store adapter
//!   - `http` / `ws`: axum REST endpoints and subscriber sessions
//!   - `config`, `metrics`, `telemetry`: service plumbing
//!
//! # Data Flow
//!
//! ```text
//! TickGenerator ---> Broadcaster ---> TopicRegistry snapshot
//!       |                                   |
//!       v                                   v
//!  cache mirror                 per-subscriber channels ---> WS clients
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core market data types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::market::{PriceBoard, SEED_PRICES, Symbol, Tick};
pub use domain::registry::{
    RegistryStats, SubscriberId, TickSender, TopicRegistry, next_subscriber_id,
};

// Application
pub use application::ports::{CacheError, TickCache, tick_cache_key};
pub use application::services::MarketService;

// Infrastructure config
pub use infrastructure::config::{
    GeneratorSettings, ServerSettings, ServiceConfig, StreamSettings,
};

// Broadcast and generation (for integration tests)
pub use infrastructure::broadcast::{Broadcaster, DeliveryReport};
pub use infrastructure::cache::MemoryTickCache;
pub use infrastructure::generator::{GeneratorError, TickGenerator, next_tick};

// HTTP server (for integration tests)
pub use infrastructure::http::{
    AppState, HealthResponse, HealthStatus, HttpServer, ServerError, SharedAppState, router,
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
