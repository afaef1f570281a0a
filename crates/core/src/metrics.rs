//! Per-request metrics collector
//!
//! Keeps the most recent request metrics in a bounded FIFO window and
//! derives analytics from it on demand.
//!
//! ## Design
//! - **VecDeque ring buffer** for O(1) eviction
//! - **Poison-safe locking** with explicit match pattern (no .expect())

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use innoverse_domain::constants::{
    ANALYTICS_RECENT_COUNT, DEFAULT_METRICS_WINDOW, LARGE_PAYLOAD_BYTES, SLOW_REQUEST_MS,
};
use innoverse_domain::{MetricStatus, NetworkAnalytics, RequestMetric};

/// Bounded window of request metrics
#[derive(Debug)]
pub struct MetricsCollector {
    capacity: usize,
    window: Mutex<VecDeque<RequestMetric>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_METRICS_WINDOW)
    }
}

impl MetricsCollector {
    /// Create a collector retaining at most `capacity` metrics
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, window: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<RequestMetric>> {
        match self.window.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                tracing::warn!(
                    metric = "MetricsCollector::window",
                    "Mutex poisoned during metrics access, recovering data"
                );
                poison_err.into_inner()
            }
        }
    }

    /// Append a metric, evicting the oldest when the window is full
    pub fn record(&self, metric: RequestMetric) {
        let mut window = self.lock();
        window.push_back(metric);
        while window.len() > self.capacity {
            window.pop_front();
        }
    }

    /// Retained metrics, oldest first
    pub fn recent(&self) -> Vec<RequestMetric> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Aggregate the retained window
    ///
    /// Averages cover requests that were actually sent (skipped probes are
    /// counted but excluded from timing and size figures).
    pub fn analytics(&self) -> NetworkAnalytics {
        let window = self.lock();

        let mut analytics = NetworkAnalytics { total_requests: window.len(), ..Default::default() };
        let mut total_time = 0u64;
        let mut total_bytes = 0u64;
        let mut sent = 0usize;
        let mut bandwidth_total = 0f64;
        let mut bandwidth_samples = 0usize;

        for metric in window.iter() {
            match metric.status {
                MetricStatus::Success => analytics.successful += 1,
                MetricStatus::Failed => analytics.failed += 1,
                MetricStatus::Skipped => {
                    analytics.skipped += 1;
                    continue;
                }
            }

            sent += 1;
            total_time += metric.response_time_ms;
            total_bytes += metric.response_bytes;
            if let Some(mbps) = metric.bandwidth_mbps() {
                bandwidth_total += mbps;
                bandwidth_samples += 1;
            }

            if metric.response_time_ms > SLOW_REQUEST_MS {
                analytics.slow_requests += 1;
            }
            if metric.response_bytes > LARGE_PAYLOAD_BYTES {
                analytics.large_payloads += 1;
            }
            if analytics.slowest.as_ref().map_or(true, |m| metric.response_time_ms > m.response_time_ms) {
                analytics.slowest = Some(metric.clone());
            }
            if analytics.largest.as_ref().map_or(true, |m| metric.response_bytes > m.response_bytes) {
                analytics.largest = Some(metric.clone());
            }
        }

        if sent > 0 {
            analytics.average_response_time_ms = total_time as f64 / sent as f64;
            analytics.average_response_bytes = total_bytes as f64 / sent as f64;
        }
        if bandwidth_samples > 0 {
            analytics.average_bandwidth_mbps = bandwidth_total / bandwidth_samples as f64;
        }

        let skip = window.len().saturating_sub(ANALYTICS_RECENT_COUNT);
        analytics.recent = window.iter().skip(skip).cloned().collect();
        analytics
    }
}
