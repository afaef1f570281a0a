//! Request metric types and derived analytics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ErrorKind;
use crate::impl_domain_status_conversions;

/// Outcome of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Success,
    Failed,
    /// Not sent (e.g. an auth-only probe without a valid token)
    Skipped,
}

impl_domain_status_conversions!(MetricStatus {
    Success => "success",
    Failed => "failed",
    Skipped => "skipped",
});

/// Timing, size and outcome of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMetric {
    pub endpoint: String,
    pub method: String,
    pub response_time_ms: u64,
    pub request_bytes: u64,
    pub response_bytes: u64,
    pub status: MetricStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub timestamp: DateTime<Utc>,
}

impl RequestMetric {
    /// Metric for a response served from cache: zero time and sizes
    pub fn cached(endpoint: impl Into<String>, method: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            response_time_ms: 0,
            request_bytes: 0,
            response_bytes: 0,
            status: MetricStatus::Success,
            error_kind: None,
            timestamp: at,
        }
    }

    /// Metric for a request that was never sent
    pub fn skipped(endpoint: impl Into<String>, method: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { status: MetricStatus::Skipped, ..Self::cached(endpoint, method, at) }
    }

    /// Estimated download rate in megabits per second
    ///
    /// `None` when no time elapsed (cache hits, skipped requests).
    pub fn bandwidth_mbps(&self) -> Option<f64> {
        if self.response_time_ms == 0 {
            return None;
        }
        Some((self.response_bytes as f64 * 8.0) / (self.response_time_ms as f64 * 1_000.0))
    }
}

/// Aggregates over the retained metric window
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkAnalytics {
    pub total_requests: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub average_response_time_ms: f64,
    pub average_response_bytes: f64,
    /// Mean of the per-request estimates over requests that took time
    #[serde(default)]
    pub average_bandwidth_mbps: f64,
    pub slowest: Option<RequestMetric>,
    pub largest: Option<RequestMetric>,
    /// Requests slower than one second
    pub slow_requests: usize,
    /// Responses larger than 100 KB
    pub large_payloads: usize,
    /// Most recent requests, newest last
    pub recent: Vec<RequestMetric>,
}
