//! Configuration management for the EWM service.
//!
//! Loads configuration from environment variables with sensible defaults.

use ewm_core::environment::LeadTimes;
use ewm_core::views::ViewConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration value.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A host/port pair does not form a socket address.
    #[error("Invalid {name} address '{value}': {source}")]
    Address {
        /// Which listener
        name: &'static str,
        /// Offending value
        value: String,
        /// Parse failure
        source: std::net::AddrParseError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Statistics collector configuration
    pub stats: StatsConfig,
    /// Event date lead times
    pub lead_times: LeadTimeConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Statistics collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Collector base URL
    pub url: String,
    /// `app` value sent with each hit
    pub app_name: String,
    /// Timeout for count queries in milliseconds
    pub timeout_ms: u64,
    /// Capacity of the hit queue
    pub hit_buffer: usize,
}

/// Lead time configuration, in hours
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeadTimeConfig {
    /// Lead time for initiator creation and edits
    pub initiator_hours: i64,
    /// Lead time for admin edits
    pub admin_hours: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed(&lookup, "PORT").unwrap_or(8080),
                log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
                metrics_host: lookup("METRICS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                metrics_port: parsed(&lookup, "METRICS_PORT").unwrap_or(9464),
                shutdown_timeout: parsed(&lookup, "SHUTDOWN_TIMEOUT").unwrap_or(30),
            },
            stats: StatsConfig {
                url: lookup("STATS_SERVER_URL").unwrap_or_else(|| "http://localhost:9090".to_string()),
                app_name: lookup("STATS_APP_NAME").unwrap_or_else(|| "ewm-main-service".to_string()),
                timeout_ms: parsed(&lookup, "STATS_TIMEOUT_MS").unwrap_or(500),
                hit_buffer: parsed(&lookup, "STATS_HIT_BUFFER").unwrap_or(1024),
            },
            lead_times: LeadTimeConfig {
                initiator_hours: parsed(&lookup, "INITIATOR_LEAD_HOURS").unwrap_or(2),
                admin_hours: parsed(&lookup, "ADMIN_LEAD_HOURS").unwrap_or(1),
            },
        }
    }

    /// HTTP listener address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Address`] if `HOST`/`PORT` do not form an address.
    pub fn http_addr(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr("HTTP", &self.server.host, self.server.port)
    }

    /// Prometheus listener address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Address`] if `METRICS_HOST`/`METRICS_PORT` do
    /// not form an address.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr("metrics", &self.server.metrics_host, self.server.metrics_port)
    }

    /// View aggregation settings.
    #[must_use]
    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            app_name: self.stats.app_name.clone(),
            query_timeout: self.stats_timeout(),
            hit_buffer: self.stats.hit_buffer,
        }
    }

    /// Stats query timeout.
    #[must_use]
    pub const fn stats_timeout(&self) -> Duration {
        Duration::from_millis(self.stats.timeout_ms)
    }

    /// Event date lead times.
    #[must_use]
    pub fn lead_times(&self) -> LeadTimes {
        LeadTimes::from_hours(self.lead_times.initiator_hours, self.lead_times.admin_hours)
    }

    /// Graceful shutdown limit.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout)
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|s| s.parse().ok())
}

fn socket_addr(name: &'static str, host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let value = format!("{host}:{port}");
    value.parse().map_err(|source| ConfigError::Address { name, value, source })
}
