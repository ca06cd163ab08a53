//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ADAPTER_TIMEOUT_SECS, DEFAULT_CALENDAR_REQUEST_TIMEOUT_SECS, DEFAULT_JOB_TIMEOUT_SECS,
    DEFAULT_LANE_IDLE_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// External calendar gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// When disabled every professional is reported as not connected.
    pub enabled: bool,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl CalendarConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Calendar sync worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound for a single adapter call.
    pub adapter_timeout_secs: u64,
    /// Upper bound for a whole sync job (several adapter calls).
    pub job_timeout_secs: u64,
    /// Idle time after which a per-appointment lane is retired.
    pub lane_idle_secs: u64,
}

impl SyncConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn lane_idle(&self) -> Duration {
        Duration::from_secs(self.lane_idle_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig { path: "careline.db".to_string(), pool_size: 8 },
            calendar: CalendarConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8787".to_string(),
            api_key: None,
            request_timeout_secs: DEFAULT_CALENDAR_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: DEFAULT_ADAPTER_TIMEOUT_SECS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            lane_idle_secs: DEFAULT_LANE_IDLE_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:8080".to_string() }
    }
}
