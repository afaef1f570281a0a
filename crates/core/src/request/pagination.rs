//! Paginated GETs with page-2 prefetch

use innoverse_domain::{ApiResponse, ClientError, Page, RequestConfig, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use super::client::ApiClient;

/// `endpoint?page=P&page_size=S`, appending with `&` when a query exists
pub fn paginated_endpoint(endpoint: &str, page: u32, page_size: u32) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}page={page}&page_size={page_size}")
}

fn has_next(body: &Value) -> bool {
    match body.get("next") {
        Some(Value::String(next)) => !next.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

impl ApiClient {
    /// Fetch one page with caching and minification on
    ///
    /// With `prefetch_next`, a first page that advertises a next page
    /// triggers a background fetch of page 2 after a short delay. The
    /// prefetch only warms the cache; its errors are dropped.
    #[instrument(skip(self))]
    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page: u32,
        page_size: u32,
        prefetch_next: bool,
    ) -> Result<ApiResponse<Page<T>>> {
        let page_endpoint = paginated_endpoint(endpoint, page, page_size);
        let response = self.get(&page_endpoint, &RequestConfig::minified()).await?;

        if prefetch_next && page == 1 && has_next(&response.data) {
            self.spawn_prefetch(paginated_endpoint(endpoint, page + 1, page_size));
        }

        let ApiResponse { data, metric, cached } = response;
        let parsed: Page<T> = serde_json::from_value(data)
            .map_err(|err| ClientError::Parse(format!("invalid page from {page_endpoint}: {err}")))?;
        Ok(ApiResponse { data: parsed, metric, cached })
    }

    fn spawn_prefetch(&self, next_endpoint: String) {
        let client = self.clone();
        let delay = self.config.prefetch_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match client.get(&next_endpoint, &RequestConfig::minified()).await {
                Ok(response) => debug!(endpoint = %next_endpoint, cached = response.cached, "prefetched"),
                Err(err) => debug!(endpoint = %next_endpoint, error = %err, "prefetch failed"),
            }
        });
    }
}
