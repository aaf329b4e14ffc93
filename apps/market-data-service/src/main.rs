//! Market Data Service Binary
//!
//! Starts the tick generator and the HTTP/WebSocket server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-data-service
//! ```
//!
//! # Environment Variables
//!
//! All optional:
//! - `MARKET_DATA_HTTP_PORT`: HTTP server port (default: 8000)
//! - `MARKET_DATA_TICK_INTERVAL_MS`: Generation interval (default: 1000)
//! - `MARKET_DATA_CACHE_TTL_SECS`: Cache entry expiry (default: 60)
//! - `MARKET_DATA_SUBSCRIBER_CAPACITY`: Per-subscriber channel capacity (default: 64)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: market-data-service)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Instant;

use market_data_service::infrastructure::telemetry;
use market_data_service::{
    AppState, Broadcaster, HttpServer, MarketService, MemoryTickCache, PriceBoard, ServiceConfig,
    TickCache, TickGenerator, TopicRegistry, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Market Data Service");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = ServiceConfig::from_env();
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Core state: board, registry, cache
    let board = Arc::new(PriceBoard::new());
    let registry = Arc::new(TopicRegistry::new(board.symbols()));
    let cache: Arc<dyn TickCache> = Arc::new(MemoryTickCache::new());

    let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));
    let service = Arc::new(MarketService::new(Arc::clone(&board), Arc::clone(&cache)));

    // Tick generator: the single interval-driven producer
    let generator = Arc::new(TickGenerator::new(
        board,
        broadcaster,
        cache,
        config.generator.clone(),
        shutdown_token.child_token(),
    ));
    let generator_handle = generator.start()?;
    tracing::info!("Tick generator started");

    // HTTP + WebSocket server
    let state = Arc::new(AppState {
        service,
        registry,
        generator,
        subscriber_capacity: config.stream.subscriber_capacity,
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: Instant::now(),
    });
    let http_server = HttpServer::new(config.server.http_port, state, shutdown_token.clone());

    let server_handle = tokio::spawn(async move {
        if let Err(e) = http_server.run().await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    tracing::info!("Market data service ready");

    await_shutdown(shutdown_token).await;

    let _ = generator_handle.await;
    let _ = server_handle.await;

    tracing::info!("Market data service stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        tick_interval_ms = config.generator.tick_interval.as_millis() as u64,
        cache_ttl_secs = config.generator.cache_ttl.as_secs(),
        subscriber_capacity = config.stream.subscriber_capacity,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
    tracing::info!("Graceful shutdown started");
}
