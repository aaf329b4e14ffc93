//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Requests**: REST request counts and durations by endpoint
//! - **Updates**: price updates delivered to subscribers, by symbol
//! - **Connections**: active WebSocket subscriber count
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "market_data_requests_total",
        "Total market data REST requests"
    );
    describe_histogram!(
        "market_data_request_duration_seconds",
        "REST request duration"
    );
    describe_counter!(
        "market_data_price_updates_total",
        "Total price updates delivered to subscribers"
    );
    describe_gauge!(
        "market_data_active_connections",
        "Active WebSocket subscriber connections"
    );
    describe_counter!(
        "market_data_cache_errors_total",
        "Cache-aside store failures by operation"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a REST request by endpoint and method.
pub fn record_request(endpoint: &'static str, method: &'static str) {
    counter!(
        "market_data_requests_total",
        "endpoint" => endpoint,
        "method" => method
    )
    .increment(1);
}

/// Record a REST request duration.
pub fn record_request_duration(endpoint: &'static str, duration: Duration) {
    histogram!(
        "market_data_request_duration_seconds",
        "endpoint" => endpoint
    )
    .record(duration.as_secs_f64());
}

/// Record price updates delivered to subscribers of a symbol.
pub fn record_ticks_delivered(symbol: &str, count: u64) {
    counter!(
        "market_data_price_updates_total",
        "symbol" => symbol.to_string()
    )
    .increment(count);
}

/// A subscriber connection was admitted.
pub fn connection_opened() {
    gauge!("market_data_active_connections").increment(1.0);
}

/// A subscriber connection was closed.
pub fn connection_closed() {
    gauge!("market_data_active_connections").decrement(1.0);
}

/// Record a cache-aside store failure.
pub fn record_cache_error(operation: &'static str) {
    counter!(
        "market_data_cache_errors_total",
        "operation" => operation
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
