/// Configuration management for the flowrun server
///
/// Handles server binding, flow storage and run pacing. Every value can be
/// overridden with a `FLOWRUN_*` environment variable.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Execution configuration
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Saved-flow storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g., "sqlite://flowrun.db" or "sqlite::memory:")
    pub url: String,
}

/// Run execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pause on each node while it is highlighted
    pub pacing_ms: u64,
    /// Timeout for httpRequest nodes
    pub http_timeout_secs: u64,
}

impl EngineConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("FLOWRUN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("FLOWRUN_PORT", 3004),
            },
            database: DatabaseConfig {
                url: std::env::var("FLOWRUN_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://flowrun.db".to_string()),
            },
            engine: EngineConfig {
                pacing_ms: env_or("FLOWRUN_PACING_MS", 600),
                http_timeout_secs: env_or("FLOWRUN_HTTP_TIMEOUT_SECS", 15),
            },
        }
    }
}

impl Config {
    /// In-memory storage and no pacing, for tests and embedding
    pub fn ephemeral() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            engine: EngineConfig {
                pacing_ms: 0,
                http_timeout_secs: 15,
            },
        }
    }
}
