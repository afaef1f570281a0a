//! Concurrent request batches with per-item isolation

use innoverse_domain::{
    ApiResponse, BatchItemResult, BatchOutcome, BatchRequest, BatchStatus, ClientError,
    HttpMethod, RequestConfig, Result,
};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::client::ApiClient;

/// Type alias for task list to avoid complexity warnings
type TaskList = Vec<(usize, JoinHandle<Result<ApiResponse<Value>>>)>;

impl ApiClient {
    /// Issue every request concurrently and report positional results
    ///
    /// One item failing never affects the others. GETs go through the
    /// cache like [`ApiClient::get`]; other methods are sent uncached.
    #[instrument(skip(self, requests, options), fields(count = requests.len()))]
    pub async fn batch(&self, requests: Vec<BatchRequest>, options: &RequestConfig) -> BatchOutcome {
        if requests.is_empty() {
            debug!("empty batch");
            return BatchOutcome::from_results(Vec::new());
        }

        let mut tasks: TaskList = Vec::with_capacity(requests.len());
        for (idx, request) in requests.iter().enumerate() {
            let client = self.clone();
            let options = options.clone();
            let request = request.clone();
            tasks.push((
                idx,
                tokio::spawn(async move {
                    match request.method {
                        HttpMethod::Get => client.get(&request.endpoint, &options).await,
                        method => {
                            client.send(method, &request.endpoint, request.payload, &options).await
                        }
                    }
                }),
            ));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for ((idx, task), request) in tasks.into_iter().zip(requests) {
            let result = match task.await {
                Ok(result) => result,
                Err(join_err) => Err(ClientError::Network(format!("Task join error: {join_err}"))),
            };
            if let Err(err) = &result {
                debug!(idx, endpoint = %request.endpoint, error = %err, "batch item failed");
            }
            results.push(BatchItemResult {
                endpoint: request.endpoint,
                method: request.method,
                result,
            });
        }

        let outcome = BatchOutcome::from_results(results);
        match outcome.status {
            BatchStatus::Success => info!(succeeded = outcome.succeeded(), "batch complete"),
            BatchStatus::Partial => warn!(
                succeeded = outcome.succeeded(),
                failed = outcome.failed(),
                "batch completed with errors"
            ),
            BatchStatus::Failed => warn!(failed = outcome.failed(), "batch failed"),
        }
        outcome
    }
}
