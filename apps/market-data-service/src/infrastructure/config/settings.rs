//! Service Configuration Settings
//!
//! Configuration types for the market data service, loaded from
//! environment variables. Every setting has a default; the service
//! starts with no environment at all.

use std::time::Duration;

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP server port (REST + WebSocket + health + metrics).
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8000 }
    }
}

/// Tick generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// Interval between generation passes.
    pub tick_interval: Duration,
    /// Expiry for mirrored cache entries.
    pub cache_ttl: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
            cache_ttl: Duration::from_secs(60),
        }
    }
}

/// Subscriber streaming settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Capacity of each subscriber's outbound channel. A subscriber
    /// that falls this far behind is dropped.
    pub subscriber_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            subscriber_capacity: 64,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Tick generator settings.
    pub generator: GeneratorSettings,
    /// Subscriber streaming settings.
    pub stream: StreamSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables, falling back
    /// to defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let server = ServerSettings {
            http_port: parse_env_u16("MARKET_DATA_HTTP_PORT", ServerSettings::default().http_port),
        };

        let generator = GeneratorSettings {
            tick_interval: parse_env_duration_millis(
                "MARKET_DATA_TICK_INTERVAL_MS",
                GeneratorSettings::default().tick_interval,
            ),
            cache_ttl: parse_env_duration_secs(
                "MARKET_DATA_CACHE_TTL_SECS",
                GeneratorSettings::default().cache_ttl,
            ),
        };

        let stream = StreamSettings {
            subscriber_capacity: parse_env_usize(
                "MARKET_DATA_SUBSCRIBER_CAPACITY",
                StreamSettings::default().subscriber_capacity,
            ),
        };

        Self {
            server,
            generator,
            stream,
        }
    }
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
