//! Configuration loader
//!
//! Loads the client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `INNOVERSE_BASE_URL` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `INNOVERSE_BASE_URL`: Backend origin (required for env loading)
//! - `INNOVERSE_READ_TIMEOUT_MS`: Deadline for GET requests
//! - `INNOVERSE_WRITE_TIMEOUT_MS`: Deadline for POST requests
//! - `INNOVERSE_CACHE_TTL_SECS`: Default cache lifetime
//! - `INNOVERSE_FRESHNESS_WINDOW_SECS`: Token validation freshness window
//! - `INNOVERSE_METRICS_WINDOW`: Number of request metrics retained
//! - `INNOVERSE_PREFETCH_DELAY_MS`: Delay before the page-2 prefetch
//! - `INNOVERSE_STORE_PATH`: SQLite file for the durable store
//! - `INNOVERSE_LOGIN_PATH`, `INNOVERSE_REFRESH_PATH`,
//!   `INNOVERSE_VALIDATION_PATH`: Authentication endpoint paths
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./innoverse.toml` or `./innoverse.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use innoverse_domain::{ClientConfig, ClientError, Result};
use url::Url;

use crate::errors::into_client_error;

const CONFIG_FILE_NAMES: [&str; 4] = ["innoverse.toml", "innoverse.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ClientError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The result fails validation
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `INNOVERSE_BASE_URL` is required; every other variable overrides the
/// corresponding default when present.
///
/// # Errors
/// Returns `ClientError::Config` if the base URL is missing or any variable
/// has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::with_base_url(env_var("INNOVERSE_BASE_URL")?);

    if let Some(value) = env_parse("INNOVERSE_READ_TIMEOUT_MS")? {
        config.read_timeout_ms = value;
    }
    if let Some(value) = env_parse("INNOVERSE_WRITE_TIMEOUT_MS")? {
        config.write_timeout_ms = value;
    }
    if let Some(value) = env_parse("INNOVERSE_CACHE_TTL_SECS")? {
        config.cache_ttl_secs = value;
    }
    if let Some(value) = env_parse("INNOVERSE_FRESHNESS_WINDOW_SECS")? {
        config.freshness_window_secs = value;
    }
    if let Some(value) = env_parse("INNOVERSE_METRICS_WINDOW")? {
        config.metrics_window = value;
    }
    if let Some(value) = env_parse("INNOVERSE_PREFETCH_DELAY_MS")? {
        config.prefetch_delay_ms = value;
    }
    if let Ok(path) = std::env::var("INNOVERSE_STORE_PATH") {
        config.store_path = Some(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var("INNOVERSE_LOGIN_PATH") {
        config.endpoints.login = path;
    }
    if let Ok(path) = std::env::var("INNOVERSE_REFRESH_PATH") {
        config.endpoints.refresh = path;
    }
    if let Ok(path) = std::env::var("INNOVERSE_VALIDATION_PATH") {
        config.endpoints.validation = path;
    }

    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Format is detected by file extension.
///
/// # Errors
/// Returns `ClientError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The result fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ClientError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ClientError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ClientError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`). Missing
/// fields take their defaults.
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(into_client_error),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ClientError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(ClientError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Domain checks plus a full URL parse of the base URL
///
/// # Errors
/// Returns `ClientError::Config` describing the first problem found.
pub fn validate(config: &ClientConfig) -> Result<()> {
    config.validate()?;

    let url = Url::parse(config.base_url.trim()).map_err(into_client_error)?;
    if url.host_str().is_none() {
        return Err(ClientError::Config(format!("base_url has no host: {}", config.base_url)));
    }
    Ok(())
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| ClientError::Config(format!("Missing required environment variable: {}", key)))
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `ClientError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ClientError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}
