//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Searches multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `CARELINE_DB_PATH`: Database file path
//! - `CARELINE_DB_POOL_SIZE`: Connection pool size
//!
//! Optional (defaults from [`Config::default`]):
//! - `CARELINE_CALENDAR_ENABLED`: Mirror appointments to external calendars
//! - `CARELINE_CALENDAR_BASE_URL`: Calendar gateway base URL
//! - `CARELINE_CALENDAR_API_KEY`: Bearer key for the gateway
//! - `CARELINE_CALENDAR_TIMEOUT_SECS`: Gateway request timeout
//! - `CARELINE_SYNC_ADAPTER_TIMEOUT_SECS`: Bound for one adapter call
//! - `CARELINE_SYNC_JOB_TIMEOUT_SECS`: Bound for one sync job
//! - `CARELINE_SYNC_LANE_IDLE_SECS`: Idle time before a sync lane retires
//! - `CARELINE_LOG_FILTER`: `EnvFilter` directive when `RUST_LOG` is unset
//! - `CARELINE_LOG_JSON`: JSON log lines (true/false)
//! - `CARELINE_HTTP_ADDR`: HTTP bind address
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./careline.json` or `./careline.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use careline_domain::{
    CalendarConfig, CarelineError, Config, DatabaseConfig, LoggingConfig, Result, ServerConfig,
    SyncConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file. The
/// result is validated either way.
///
/// # Errors
/// Returns `CarelineError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing or out of range
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    validate(&config)?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `CARELINE_DB_PATH` and `CARELINE_DB_POOL_SIZE` must be present; every
/// other variable falls back to its default.
///
/// # Errors
/// Returns `CarelineError::Config` if required variables are missing
/// or any variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let database = DatabaseConfig {
        path: env_var("CARELINE_DB_PATH")?,
        pool_size: env_parse("CARELINE_DB_POOL_SIZE")?,
    };

    let calendar_defaults = CalendarConfig::default();
    let calendar = CalendarConfig {
        enabled: env_bool("CARELINE_CALENDAR_ENABLED", calendar_defaults.enabled),
        base_url: env_opt("CARELINE_CALENDAR_BASE_URL").unwrap_or(calendar_defaults.base_url),
        api_key: env_opt("CARELINE_CALENDAR_API_KEY"),
        request_timeout_secs: env_parse_or(
            "CARELINE_CALENDAR_TIMEOUT_SECS",
            calendar_defaults.request_timeout_secs,
        )?,
    };

    let sync_defaults = SyncConfig::default();
    let sync = SyncConfig {
        adapter_timeout_secs: env_parse_or(
            "CARELINE_SYNC_ADAPTER_TIMEOUT_SECS",
            sync_defaults.adapter_timeout_secs,
        )?,
        job_timeout_secs: env_parse_or(
            "CARELINE_SYNC_JOB_TIMEOUT_SECS",
            sync_defaults.job_timeout_secs,
        )?,
        lane_idle_secs: env_parse_or("CARELINE_SYNC_LANE_IDLE_SECS", sync_defaults.lane_idle_secs)?,
    };

    let logging_defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        filter: env_opt("CARELINE_LOG_FILTER").unwrap_or(logging_defaults.filter),
        json: env_bool("CARELINE_LOG_JSON", logging_defaults.json),
    };

    let server = ServerConfig {
        bind_addr: env_opt("CARELINE_HTTP_ADDR").unwrap_or(ServerConfig::default().bind_addr),
    };

    Ok(Config { database, calendar, sync, logging, server })
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CarelineError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CarelineError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            CarelineError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CarelineError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Reject values the runtime cannot work with.
///
/// # Errors
/// Returns `CarelineError::Config` naming the first offending field.
pub fn validate(config: &Config) -> Result<()> {
    if config.database.path.trim().is_empty() {
        return Err(CarelineError::Config("database.path must not be empty".into()));
    }
    if config.database.pool_size == 0 {
        return Err(CarelineError::Config("database.pool_size must be at least 1".into()));
    }
    if config.calendar.enabled && config.calendar.base_url.trim().is_empty() {
        return Err(CarelineError::Config(
            "calendar.base_url is required when calendar sync is enabled".into(),
        ));
    }

    let timeouts = [
        ("calendar.request_timeout_secs", config.calendar.request_timeout_secs),
        ("sync.adapter_timeout_secs", config.sync.adapter_timeout_secs),
        ("sync.job_timeout_secs", config.sync.job_timeout_secs),
        ("sync.lane_idle_secs", config.sync.lane_idle_secs),
    ];
    if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
        return Err(CarelineError::Config(format!("{name} must be greater than zero")));
    }

    if config.sync.job_timeout_secs < config.sync.adapter_timeout_secs {
        tracing::warn!(
            job_timeout_secs = config.sync.job_timeout_secs,
            adapter_timeout_secs = config.sync.adapter_timeout_secs,
            "sync job timeout is shorter than a single adapter call"
        );
    }

    Ok(())
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CarelineError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CarelineError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(CarelineError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Search multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./careline.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_file() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("careline.json"),
        dir.join("careline.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        CarelineError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional variable; blank counts as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_var(key)?;
    raw.trim()
        .parse::<T>()
        .map_err(|e| CarelineError::Config(format!("Invalid value for {key}: {e}")))
}

fn env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(_) => env_parse(key),
        None => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
