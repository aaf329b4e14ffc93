//! HTTP Server
//!
//! REST snapshot endpoints, health checks, Prometheus metrics, and the
//! WebSocket upgrade route, all on one port.
//!
//! # Endpoints
//!
//! - `GET /` - Service info and endpoint map
//! - `GET /api/symbols` - The fixed symbol universe
//! - `GET /api/markets` - Snapshot for every symbol
//! - `GET /api/market/{symbol}` - Snapshot for one symbol
//! - `GET /ws/{symbol}` - WebSocket tick stream
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (generator running)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::Path, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::application::services::MarketService;
use crate::domain::registry::TopicRegistry;
use crate::infrastructure::generator::TickGenerator;
use crate::infrastructure::metrics::{self, get_metrics_handle};
use crate::infrastructure::ws;

// =============================================================================
// Shared State
// =============================================================================

/// State shared by every HTTP and WebSocket handler.
pub struct AppState {
    /// Snapshot queries and symbol discovery.
    pub service: Arc<MarketService>,
    /// Subscriber registry for fan-out.
    pub registry: Arc<TopicRegistry>,
    /// The tick generator, for health reporting.
    pub generator: Arc<TickGenerator>,
    /// Outbound channel capacity per subscriber.
    pub subscriber_capacity: usize,
    /// Service version.
    pub version: String,
    /// Process start time, for uptime reporting.
    pub started_at: Instant,
}

/// Shared application state reference.
pub type SharedAppState = Arc<AppState>;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded".
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Whether the tick generator loop is running.
    pub generator_running: bool,
    /// Number of symbols in the fixed universe.
    pub symbols: usize,
    /// Active WebSocket subscribers.
    pub subscribers: usize,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Generator running, updates flowing.
    Healthy,
    /// Serving snapshots but the generator is not running.
    Degraded,
}

// =============================================================================
// HTTP Server
// =============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

/// The service's HTTP server.
pub struct HttpServer {
    port: u16,
    state: SharedAppState,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new HTTP server.
    #[must_use]
    pub const fn new(port: u16, state: SharedAppState, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the service router over shared state.
///
/// Exposed separately from [`HttpServer`] so integration tests can
/// serve it on an ephemeral port.
pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/symbols", get(symbols_handler))
        .route("/api/markets", get(markets_handler))
        .route("/api/market/{symbol}", get(market_handler))
        .route("/ws/{symbol}", get(ws::ws_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        // Browser dashboards call this API cross-origin.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn root_handler(State(state): State<SharedAppState>) -> impl IntoResponse {
    metrics::record_request("/", "GET");
    Json(json!({
        "service": "Market Data Service",
        "version": state.version,
        "endpoints": {
            "market_data": "/api/market/{symbol}",
            "all_markets": "/api/markets",
            "symbols": "/api/symbols",
            "websocket": "/ws/{symbol}",
        }
    }))
}

async fn symbols_handler(State(state): State<SharedAppState>) -> impl IntoResponse {
    metrics::record_request("/api/symbols", "GET");
    Json(json!({ "symbols": state.service.symbols() }))
}

async fn markets_handler(State(state): State<SharedAppState>) -> impl IntoResponse {
    metrics::record_request("/api/markets", "GET");
    let started = Instant::now();

    let ticks = state.service.all_snapshots().await;

    metrics::record_request_duration("/api/markets", started.elapsed());
    Json(ticks)
}

async fn market_handler(
    State(state): State<SharedAppState>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    metrics::record_request("/api/market/{symbol}", "GET");
    let started = Instant::now();

    let symbol = symbol.to_uppercase();
    let response = state.service.snapshot(&symbol).await.map_or_else(
        || {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": format!("Symbol {symbol} not found") })),
            )
                .into_response()
        },
        |tick| Json(tick).into_response(),
    );

    metrics::record_request_duration("/api/market/{symbol}", started.elapsed());
    response
}

async fn health_handler(State(state): State<SharedAppState>) -> impl IntoResponse {
    let response = build_health_response(&state);
    // Both states serve traffic; degraded only means stale data.
    (StatusCode::OK, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<SharedAppState>) -> impl IntoResponse {
    if state.generator.is_running() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let stats = state.registry.stats();
    let generator_running = state.generator.is_running();

    HealthResponse {
        status: if generator_running {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        generator_running,
        symbols: stats.topics,
        subscribers: stats.subscribers,
    }
}

// =============================================================================
// Tests
// =============================================================================
