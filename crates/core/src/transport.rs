//! Executor wrapper that records every request metric

use std::sync::Arc;

use innoverse_domain::{RequestMetric, Result};

use crate::metrics::MetricsCollector;
use crate::ports::{ExecutedResponse, OutboundRequest, RequestExecutor};

#[derive(Clone)]
pub struct Transport {
    executor: Arc<dyn RequestExecutor>,
    metrics: Arc<MetricsCollector>,
}

impl Transport {
    pub fn new(executor: Arc<dyn RequestExecutor>, metrics: Arc<MetricsCollector>) -> Self {
        Self { executor, metrics }
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Execute `request`, record its metric, and return the response with
    /// the metric attached.
    pub async fn send(&self, request: OutboundRequest) -> Result<(ExecutedResponse, RequestMetric)> {
        let execution = self.executor.execute(request).await;
        self.metrics.record(execution.metric.clone());
        execution.outcome.map(|response| (response, execution.metric))
    }
}
