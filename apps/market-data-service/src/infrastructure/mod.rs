//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port
//! interfaces defined in the application layer, plus the service edges.

/// Per-pass broadcast delivery to registered subscribers.
pub mod broadcast;

/// In-process cache-aside adapter.
pub mod cache;

/// Configuration loading.
pub mod config;

/// Interval-driven tick generation.
pub mod generator;

/// HTTP server: REST snapshots, health, metrics.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;

/// WebSocket subscription sessions.
pub mod ws;
