//! Request layer: cached GETs, minified POSTs, credential attachment

use std::sync::Arc;

use innoverse_domain::constants::MINIFY_RESPONSE_HEADER;
use innoverse_domain::{
    cache_key, ApiResponse, CacheStats, ClientConfig, HttpMethod, NetworkAnalytics,
    RequestConfig, RequestMetric, Result,
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::minify::minify;
use crate::auth::TokenStore;
use crate::cache::ResponseCache;
use crate::clock::Clock;
use crate::ports::OutboundRequest;
use crate::transport::Transport;

const COMPRESSED_ENCODINGS: &str = "gzip, deflate, br";

/// Optimized request layer shared by every screen
///
/// Cheap to clone; clones share the cache, metrics and token store.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) transport: Transport,
    pub(crate) cache: Arc<ResponseCache>,
    pub(crate) tokens: TokenStore,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: Arc<ClientConfig>,
}

impl ApiClient {
    pub fn new(
        transport: Transport,
        cache: Arc<ResponseCache>,
        tokens: TokenStore,
        clock: Arc<dyn Clock>,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self { transport, cache, tokens, clock, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `endpoint`, consulting the response cache first
    ///
    /// A cache hit returns `cached = true` with a zeroed metric and sends
    /// nothing. Successful network responses are written through to the
    /// cache when caching is enabled.
    #[instrument(skip(self, options), fields(cache = options.cache))]
    pub async fn get(&self, endpoint: &str, options: &RequestConfig) -> Result<ApiResponse<Value>> {
        let url = self.config.url_for(endpoint);
        let key = cache_key(HttpMethod::Get.as_str(), &url);

        if options.cache {
            if let Some(data) = self.cache.get(&key).await {
                let metric = RequestMetric::cached(endpoint, HttpMethod::Get.as_str(), self.clock.now());
                return Ok(ApiResponse { data, metric, cached: true });
            }
        }

        let response = self.send(HttpMethod::Get, endpoint, None, options).await?;

        if options.cache {
            self.cache.set(&key, response.data.clone(), options.cache_ttl).await;
        }
        Ok(response)
    }

    /// POST `payload` to `endpoint`; never cached
    #[instrument(skip(self, payload, options), fields(minify = options.minify))]
    pub async fn post(
        &self,
        endpoint: &str,
        payload: Value,
        options: &RequestConfig,
    ) -> Result<ApiResponse<Value>> {
        self.send(HttpMethod::Post, endpoint, Some(payload), options).await
    }

    /// Send a request without touching the cache
    ///
    /// Attaches the stored bearer token when present. No refresh is
    /// attempted; a 401 surfaces as an auth error.
    pub async fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: Option<Value>,
        options: &RequestConfig,
    ) -> Result<ApiResponse<Value>> {
        let timeout = options.timeout.unwrap_or_else(|| {
            if method.is_read() {
                self.config.read_timeout()
            } else {
                self.config.write_timeout()
            }
        });

        let mut request = OutboundRequest::new(method, self.config.url_for(endpoint), timeout)
            .header("Content-Type", "application/json")
            .header(
                "Accept-Encoding",
                if options.compress { COMPRESSED_ENCODINGS } else { "identity" },
            );

        if options.minify && method.is_read() {
            request = request.header(MINIFY_RESPONSE_HEADER, "true");
        }

        match self.tokens.access_token().await {
            Ok(Some(token)) => request = request.bearer(&token),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "access token unreadable, sending anonymously"),
        }

        if let Some(payload) = payload {
            let body = if options.minify { minify(payload) } else { payload };
            request = request.json(body);
        }

        let (response, metric) = self.transport.send(request).await?;
        debug!(status = response.status, ms = metric.response_time_ms, "request complete");
        Ok(ApiResponse { data: response.body, metric, cached: false })
    }

    /* ---------------------------------------------------------------------- */
    /* Cache & metrics */
    /* ---------------------------------------------------------------------- */

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn analytics(&self) -> NetworkAnalytics {
        self.transport.metrics().analytics()
    }

    pub fn recent_metrics(&self) -> Vec<RequestMetric> {
        self.transport.metrics().recent()
    }

    pub fn clear_metrics(&self) {
        self.transport.metrics().clear();
    }

    /// Record a metric for a request that was deliberately not sent
    pub fn record_skipped(&self, endpoint: &str, method: HttpMethod) {
        self.transport
            .metrics()
            .record(RequestMetric::skipped(endpoint, method.as_str(), self.clock.now()));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use innoverse_domain::constants::ACCESS_TOKEN_KEY;
    use innoverse_domain::{ClientError, MetricStatus};
    use serde_json::json;

    use super::*;
    use crate::ports::KeyValueStore;
    use crate::testing::{fixture, ScriptedExecutor};

    /// Validates the read-through cache on GET.
    ///
    /// Assertions:
    /// - The second GET is served from cache without a network call.
    /// - The cached response carries a zeroed metric.
    /// - After the TTL the GET goes back to the network.
    #[tokio::test]
    async fn test_get_caches_successful_responses() {
        let executor = ScriptedExecutor::new();
        executor.respond(HttpMethod::Get, "/api/info/QR1/", json!({"allowed": true}));
        let f = fixture(executor);

        let first = f.client.get("/api/info/QR1/", &RequestConfig::default()).await.unwrap();
        assert!(!first.cached);

        let second = f.client.get("/api/info/QR1/", &RequestConfig::default()).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.data, json!({"allowed": true}));
        assert_eq!(second.metric.response_time_ms, 0);
        assert_eq!(f.executor.call_count(HttpMethod::Get, "/api/info/QR1/"), 1);
        assert_eq!(
            f.client.cache_stats().memory_entries,
            vec!["GET:https://checkin.example.org/api/info/QR1/".to_string()]
        );

        f.clock.advance(Duration::from_secs(301));
        let third = f.client.get("/api/info/QR1/", &RequestConfig::default()).await.unwrap();
        assert!(!third.cached);
        assert_eq!(f.executor.call_count(HttpMethod::Get, "/api/info/QR1/"), 2);
    }

    #[tokio::test]
    async fn test_uncached_get_skips_cache_entirely() {
        let executor = ScriptedExecutor::new();
        executor.respond(HttpMethod::Get, "/api/gifts/QR1/", json!({"tshirt": 1}));
        let f = fixture(executor);

        for _ in 0..2 {
            let response = f.client.get("/api/gifts/QR1/", &RequestConfig::uncached()).await.unwrap();
            assert!(!response.cached);
        }
        assert_eq!(f.executor.call_count(HttpMethod::Get, "/api/gifts/QR1/"), 2);
        assert_eq!(f.client.cache_stats().in_memory_size, 0);
    }

    #[tokio::test]
    async fn test_failed_get_is_not_cached() {
        let executor = ScriptedExecutor::new();
        executor.fail(
            HttpMethod::Get,
            "/api/info/QR9/",
            ClientError::Server { status: 500, message: "boom".into() },
        );
        let f = fixture(executor);

        let err = f.client.get("/api/info/QR9/", &RequestConfig::default()).await.unwrap_err();
        assert_eq!(err.kind(), innoverse_domain::ErrorKind::Server);
        assert_eq!(f.client.cache_stats().in_memory_size, 0);
        assert_eq!(f.client.analytics().failed, 1);
    }

    /// Validates header construction and opt-in POST minification.
    #[tokio::test]
    async fn test_post_minifies_and_attaches_bearer() {
        let executor = ScriptedExecutor::new();
        executor.respond(HttpMethod::Post, "/api/recordentry/QR1/", json!({"success": true}));
        let f = fixture(executor);
        f.store.set_item(ACCESS_TOKEN_KEY, "tok-1").await.unwrap();

        f.client
            .post(
                "/api/recordentry/QR1/",
                json!({"gate": "A", "note": "", "operator": null}),
                &RequestConfig { minify: true, ..RequestConfig::default() },
            )
            .await
            .unwrap();

        let call = &f.executor.calls()[0];
        assert_eq!(call.body, Some(json!({"gate": "A"})));
        assert_eq!(call.header_value("Authorization"), Some("Bearer tok-1"));
        assert_eq!(call.header_value("Content-Type"), Some("application/json"));
        assert_eq!(call.header_value(MINIFY_RESPONSE_HEADER), None);
        assert_eq!(call.timeout, Duration::from_secs(15));
        assert_eq!(f.client.cache_stats().in_memory_size, 0);
    }

    /// Validates that a default POST sends its payload untouched.
    #[tokio::test]
    async fn test_default_post_keeps_empty_fields() {
        let executor = ScriptedExecutor::new();
        executor.respond(HttpMethod::Post, "/api/feedback/", json!({"ok": true}));
        let f = fixture(executor);

        let payload = json!({"rating": 4, "comment": "", "tags": null});
        f.client.post("/api/feedback/", payload.clone(), &RequestConfig::default()).await.unwrap();
        f.client.get("/api/feedback/", &RequestConfig::uncached()).await.unwrap_err();

        let calls = f.executor.calls();
        assert_eq!(calls[0].body, Some(payload));
        assert_eq!(calls[0].header_value(MINIFY_RESPONSE_HEADER), None);
        assert_eq!(calls[1].header_value(MINIFY_RESPONSE_HEADER), None);
    }

    #[tokio::test]
    async fn test_get_headers_follow_options() {
        let executor = ScriptedExecutor::new();
        executor.respond(HttpMethod::Get, "/a", json!({}));
        let f = fixture(executor);

        let options = RequestConfig {
            cache: false,
            compress: false,
            minify: true,
            timeout: Some(Duration::from_secs(3)),
            ..RequestConfig::default()
        };
        f.client.get("/a", &options).await.unwrap();

        let call = &f.executor.calls()[0];
        assert_eq!(call.header_value("Accept-Encoding"), Some("identity"));
        assert_eq!(call.header_value(MINIFY_RESPONSE_HEADER), Some("true"));
        assert_eq!(call.header_value("Authorization"), None);
        assert_eq!(call.timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_metrics_and_skipped_records() {
        let executor = ScriptedExecutor::new();
        executor.respond(HttpMethod::Get, "/a", json!({"ok": true}));
        let f = fixture(executor);

        f.client.get("/a", &RequestConfig::default()).await.unwrap();
        f.client.get("/a", &RequestConfig::default()).await.unwrap();
        f.client.record_skipped("/b", HttpMethod::Get);

        let recent = f.client.recent_metrics();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].status, MetricStatus::Skipped);

        f.client.clear_metrics();
        assert!(f.client.recent_metrics().is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let executor = ScriptedExecutor::new();
        executor.respond(HttpMethod::Get, "/a", json!(1));
        let f = fixture(executor);
        f.store.set_item(ACCESS_TOKEN_KEY, "tok").await.unwrap();

        f.client.get("/a", &RequestConfig::default()).await.unwrap();
        assert_eq!(f.store.len(), 2);

        f.client.clear_cache().await;
        assert_eq!(f.client.cache_stats().in_memory_size, 0);
        assert_eq!(f.store.all_keys().await.unwrap(), vec![ACCESS_TOKEN_KEY.to_string()]);
    }
}
