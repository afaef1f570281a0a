//! Client configuration structures

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_FRESHNESS_WINDOW_SECS, DEFAULT_LOGIN_PATH,
    DEFAULT_METRICS_WINDOW, DEFAULT_PREFETCH_DELAY_MS, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_REFRESH_PATH, DEFAULT_VALIDATION_PATH, DEFAULT_WRITE_TIMEOUT_MS,
};
use crate::errors::{ClientError, Result};

/// Runtime configuration for the check-in client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://api.example.org`
    pub base_url: String,
    /// Deadline for GET requests
    pub read_timeout_ms: u64,
    /// Deadline for POST requests
    pub write_timeout_ms: u64,
    /// Default lifetime of cached GET responses
    pub cache_ttl_secs: u64,
    /// A validation younger than this skips the network probe
    pub freshness_window_secs: u64,
    /// Number of request metrics retained
    pub metrics_window: usize,
    /// Delay before the page-2 prefetch fires
    pub prefetch_delay_ms: u64,
    pub endpoints: EndpointConfig,
    /// SQLite file backing the durable store; in-memory when unset
    pub store_path: Option<PathBuf>,
}

/// Paths of the authentication endpoints, relative to `base_url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub login: String,
    pub refresh: String,
    pub validation: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN_PATH.to_string(),
            refresh: DEFAULT_REFRESH_PATH.to_string(),
            validation: DEFAULT_VALIDATION_PATH.to_string(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
            metrics_window: DEFAULT_METRICS_WINDOW,
            prefetch_delay_ms: DEFAULT_PREFETCH_DELAY_MS,
            endpoints: EndpointConfig::default(),
            store_path: None,
        }
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything except the backend origin
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn prefetch_delay(&self) -> Duration {
        Duration::from_millis(self.prefetch_delay_ms)
    }

    /// Join `base_url` and an endpoint path or absolute URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if endpoint.starts_with('/') {
            format!("{base}{endpoint}")
        } else {
            format!("{base}/{endpoint}")
        }
    }

    /// Reject configurations the runtime cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) URL, got {base}"
            )));
        }
        if self.read_timeout_ms == 0 || self.write_timeout_ms == 0 {
            return Err(ClientError::Config("timeouts must be greater than zero".into()));
        }
        if self.metrics_window == 0 {
            return Err(ClientError::Config("metrics_window must be greater than zero".into()));
        }
        Ok(())
    }
}
