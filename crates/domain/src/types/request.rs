//! Request layer types: methods, per-call options, responses, batches

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::impl_domain_status_conversions;
use crate::types::metrics::RequestMetric;

/* -------------------------------------------------------------------------- */
/* Method & Options */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Reads use the read deadline; everything else uses the write deadline.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Consult and populate the response cache (GET only)
    pub cache: bool,
    /// Lifetime of the cached response; the configured default when unset
    pub cache_ttl: Option<Duration>,
    /// Accept compressed responses; `identity` encoding when off
    pub compress: bool,
    /// Strip empty fields from POST bodies and ask the backend for a
    /// minified GET response
    pub minify: bool,
    /// Deadline override
    pub timeout: Option<Duration>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { cache: true, cache_ttl: None, compress: true, minify: false, timeout: None }
    }
}

impl RequestConfig {
    /// Options for a read that must hit the network
    pub fn uncached() -> Self {
        Self { cache: false, ..Self::default() }
    }

    /// Cached options with minification on, as list screens use
    pub fn minified() -> Self {
        Self { minify: true, ..Self::default() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }
}

/* -------------------------------------------------------------------------- */
/* Responses */
/* -------------------------------------------------------------------------- */

/// Response body with the metric recorded for the call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub metric: RequestMetric,
    /// Served from the response cache without a network call
    pub cached: bool,
}

impl<T> ApiResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse { data: f(self.data), metric: self.metric, cached: self.cached }
    }
}

/* -------------------------------------------------------------------------- */
/* Batches */
/* -------------------------------------------------------------------------- */

/// One entry of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub endpoint: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl BatchRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), method: HttpMethod::Get, payload: None }
    }

    pub fn post(endpoint: impl Into<String>, payload: Value) -> Self {
        Self { endpoint: endpoint.into(), method: HttpMethod::Post, payload: Some(payload) }
    }
}

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every item succeeded
    Success,
    /// At least one item succeeded and at least one failed
    Partial,
    /// No item succeeded, or the batch was empty
    Failed,
}

impl_domain_status_conversions!(BatchStatus {
    Success => "success",
    Partial => "partial",
    Failed => "failed",
});

/// Result of one batch item, in the position of its request
#[derive(Debug, Clone)]
pub struct BatchItemResult {
    pub endpoint: String,
    pub method: HttpMethod,
    pub result: Result<ApiResponse<Value>>,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Positional results plus the aggregate status
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub status: BatchStatus,
    pub results: Vec<BatchItemResult>,
}

impl BatchOutcome {
    /// Aggregate positional results; an empty batch is `Failed`.
    pub fn from_results(results: Vec<BatchItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let status = if succeeded == 0 {
            BatchStatus::Failed
        } else if succeeded == results.len() {
            BatchStatus::Success
        } else {
            BatchStatus::Partial
        };
        Self { status, results }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}
