//! Client facade for the check-in app
//!
//! Wires the durable store, HTTP executor, metrics, cache and token
//! lifecycle into one handle that screens call into.

use std::sync::Arc;
use std::time::Duration;

use innoverse_core::diagnostics::AuthProbe;
use innoverse_core::{
    ApiClient, AuthManager, Clock, DiagnosticsPlan, DiagnosticsReport, KeyValueStore,
    MemoryStore, MetricsCollector, RequestExecutor, ResponseCache, SystemClock, TokenStore,
    Transport,
};
use innoverse_domain::{
    ApiResponse, AuthState, BatchOutcome, BatchRequest, CacheStats, ClientConfig, ClientError,
    NetworkAnalytics, Page, RequestConfig, RequestMetric, ResponseVariant, Result, UserProfile,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::loader;
use crate::database::{DbManager, SqliteKeyValueStore};
use crate::http::{HttpClient, HttpExecutor};

const STORE_POOL_SIZE: u32 = 4;

/// Networked client runtime shared by every screen
///
/// Cheap to clone; clones share tokens, cache and metrics.
#[derive(Clone)]
pub struct InnoverseClient {
    auth: AuthManager,
    api: ApiClient,
}

impl InnoverseClient {
    /// Create a builder for fluent configuration
    pub fn builder() -> InnoverseClientBuilder {
        InnoverseClientBuilder::default()
    }

    /// Build a client from environment variables or a probed config file
    ///
    /// # Errors
    /// Returns `ClientError::Config` when no valid configuration is found, or
    /// the store/HTTP client cannot be created.
    pub fn from_env() -> Result<Self> {
        Self::builder().config(loader::load()?).build()
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn config(&self) -> &ClientConfig {
        self.api.config()
    }

    /* ---------------------------------------------------------------------- */
    /* Authentication */
    /* ---------------------------------------------------------------------- */

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        self.auth.login(username, password).await
    }

    pub async fn logout(&self) {
        self.auth.logout().await;
    }

    pub async fn check_auth_status(&self) -> AuthState {
        self.auth.check_auth_status().await
    }

    pub async fn validate_token(&self) -> bool {
        self.auth.validate_token().await
    }

    pub async fn refresh_access_token(&self) -> Result<String> {
        self.auth.refresh_access_token().await
    }

    pub fn state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.auth.profile()
    }

    /// Re-validate the token every `interval` until the handle is aborted
    pub fn spawn_periodic_validation(&self, interval: Duration) -> JoinHandle<()> {
        self.auth.spawn_periodic_validation(interval)
    }

    /* ---------------------------------------------------------------------- */
    /* Request Layer */
    /* ---------------------------------------------------------------------- */

    pub async fn get(&self, endpoint: &str, options: &RequestConfig) -> Result<ApiResponse<Value>> {
        self.api.get(endpoint, options).await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        payload: Value,
        options: &RequestConfig,
    ) -> Result<ApiResponse<Value>> {
        self.api.post(endpoint, payload, options).await
    }

    pub async fn batch(&self, requests: Vec<BatchRequest>, options: &RequestConfig) -> BatchOutcome {
        self.api.batch(requests, options).await
    }

    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page: u32,
        page_size: u32,
        prefetch_next: bool,
    ) -> Result<ApiResponse<Page<T>>> {
        self.api.get_paginated(endpoint, page, page_size, prefetch_next).await
    }

    pub async fn clear_cache(&self) {
        self.api.clear_cache().await;
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.api.cache_stats()
    }

    pub fn analytics(&self) -> NetworkAnalytics {
        self.api.analytics()
    }

    pub fn recent_metrics(&self) -> Vec<RequestMetric> {
        self.api.recent_metrics()
    }

    pub fn clear_metrics(&self) {
        self.api.clear_metrics();
    }

    /* ---------------------------------------------------------------------- */
    /* Check-in */
    /* ---------------------------------------------------------------------- */

    pub async fn record_entry(&self, qr: &str) -> Result<ApiResponse<ResponseVariant>> {
        self.api.record_entry(qr).await
    }

    pub async fn gifts(&self, qr: &str) -> Result<ApiResponse<ResponseVariant>> {
        self.api.gifts(qr).await
    }

    pub async fn claim_gift(&self, gift: &str, qr: &str) -> Result<ApiResponse<ResponseVariant>> {
        self.api.claim_gift(gift, qr).await
    }

    pub async fn participant_info(&self, qr: &str) -> Result<ApiResponse<ResponseVariant>> {
        self.api.participant_info(qr).await
    }

    pub async fn generic_check(
        &self,
        page: &str,
        segment: Option<&str>,
        qr: &str,
    ) -> Result<ApiResponse<ResponseVariant>> {
        self.api.generic_check(page, segment, qr).await
    }

    /* ---------------------------------------------------------------------- */
    /* Diagnostics */
    /* ---------------------------------------------------------------------- */

    pub async fn probe_auth(&self) -> AuthProbe {
        self.api.probe_auth().await
    }

    pub async fn run_diagnostics(&self, plan: &DiagnosticsPlan) -> DiagnosticsReport {
        self.api.run_diagnostics(plan).await
    }
}

/// Builder for [`InnoverseClient`]
///
/// Only the configuration is required. The store defaults to SQLite when
/// `store_path` is set and to memory otherwise; the executor defaults to
/// [`HttpExecutor`].
#[derive(Default)]
pub struct InnoverseClientBuilder {
    config: Option<ClientConfig>,
    store: Option<Arc<dyn KeyValueStore>>,
    executor: Option<Arc<dyn RequestExecutor>>,
    clock: Option<Arc<dyn Clock>>,
}

impl InnoverseClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Shorthand for a default configuration pointed at `base_url`
    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        self.config(ClientConfig::with_base_url(base_url))
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns error if the configuration is missing or invalid, or the
    /// store or HTTP client cannot be created.
    pub fn build(self) -> Result<InnoverseClient> {
        let config =
            self.config.ok_or_else(|| ClientError::Config("configuration not set".to_string()))?;
        loader::validate(&config)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let store: Arc<dyn KeyValueStore> = match (self.store, &config.store_path) {
            (Some(store), _) => store,
            (None, Some(path)) => {
                let db = DbManager::open(path, STORE_POOL_SIZE)?;
                Arc::new(SqliteKeyValueStore::new(Arc::new(db)))
            }
            (None, None) => Arc::new(MemoryStore::new()),
        };

        let executor: Arc<dyn RequestExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(HttpExecutor::new(HttpClient::new()?).with_clock(clock.clone())),
        };

        let config = Arc::new(config);
        let metrics = Arc::new(MetricsCollector::new(config.metrics_window));
        let transport = Transport::new(executor, metrics);
        let tokens = TokenStore::new(store.clone());
        let cache = Arc::new(ResponseCache::new(store, clock.clone(), config.cache_ttl()));

        let auth = AuthManager::new(transport.clone(), tokens.clone(), clock.clone(), config.clone());
        let api = ApiClient::new(transport, cache, tokens, clock, config.clone());

        info!(
            base_url = %config.base_url,
            durable = config.store_path.is_some(),
            "innoverse client initialised"
        );
        Ok(InnoverseClient { auth, api })
    }
}

#[cfg(test)]
mod tests {
    use innoverse_domain::HttpMethod;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn build_requires_valid_config() {
        let missing = InnoverseClient::builder().build();
        assert!(matches!(missing, Err(ClientError::Config(_))));

        let invalid = InnoverseClient::builder().base_url("").build();
        assert!(matches!(invalid, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn build_with_sqlite_store_path() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("innoverse.db");
        let config = ClientConfig {
            store_path: Some(db_path.clone()),
            ..ClientConfig::with_base_url("https://checkin.example.org")
        };

        let client = InnoverseClient::builder().config(config).build().unwrap();

        assert!(db_path.exists());
        assert_eq!(client.state(), AuthState::Unauthenticated);
        assert_eq!(client.check_auth_status().await, AuthState::Unauthenticated);
    }

    /// Validates the default wiring end to end against a mock backend.
    ///
    /// Assertions:
    /// - Login persists tokens that later requests send as a bearer header.
    /// - The second GET is a cache hit and only one network metric exists.
    #[tokio::test]
    async fn login_then_cached_get() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": "acc-1",
                "refresh": "ref-1",
                "user": {"id": 3, "username": "ada", "email": "ada@example.org"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/reels/"))
            .and(header("authorization", "Bearer acc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let client = InnoverseClient::builder().base_url(server.uri()).build().unwrap();

        let profile = client.login("ada", "secret").await.unwrap();
        assert_eq!(profile.username, "ada");
        assert_eq!(client.state(), AuthState::Authenticated);

        let first = client.get("/api/reels/", &RequestConfig::default()).await.unwrap();
        let second = client.get("/api/reels/", &RequestConfig::default()).await.unwrap();
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.data, json!([{"id": 1}]));

        let analytics = client.analytics();
        assert_eq!(analytics.total_requests, 2);
        assert_eq!(analytics.successful, 2);
        assert_eq!(client.cache_stats().in_memory_size, 1);
        assert_eq!(client.recent_metrics()[1].method, HttpMethod::Get.to_string());
    }
}
