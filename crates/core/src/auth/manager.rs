//! Token lifecycle manager
//!
//! Manages the credential lifecycle:
//! - Login and logout
//! - Startup status check with a freshness window (no network when fresh)
//! - Token validation against the profile probe
//! - Single-flight silent refresh
//! - Optional background re-validation task

use std::sync::Arc;
use std::time::Duration;

use futures::future::FutureExt;
use innoverse_domain::{
    AuthState, ClientConfig, ClientError, CredentialRecord, HttpMethod, LoginRequest,
    LoginResponse, RefreshRequest, RefreshResponse, Result, UserProfile,
};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use super::token_store::TokenStore;
use crate::clock::Clock;
use crate::ports::OutboundRequest;
use crate::transport::Transport;

/// Token lifecycle manager
///
/// Cheap to clone; clones share state and storage. The in-flight refresh
/// lives in the [`TokenStore`] so the request layer can wait on it too.
#[derive(Clone)]
pub struct AuthManager {
    transport: Transport,
    tokens: TokenStore,
    clock: Arc<dyn Clock>,
    config: Arc<ClientConfig>,
    state: Arc<RwLock<AuthState>>,
    profile: Arc<RwLock<Option<UserProfile>>>,
}

impl AuthManager {
    pub fn new(
        transport: Transport,
        tokens: TokenStore,
        clock: Arc<dyn Clock>,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            transport,
            tokens,
            clock,
            config,
            state: Arc::new(RwLock::new(AuthState::Unauthenticated)),
            profile: Arc::new(RwLock::new(None)),
        }
    }

    pub fn state(&self) -> AuthState {
        *self.state.read()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }

    /// Stored access token, without validation
    ///
    /// Waits for an in-flight refresh and returns its result.
    pub async fn current_access_token(&self) -> Result<Option<String>> {
        self.tokens.access_token().await
    }

    fn set_state(&self, state: AuthState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            debug!(from = %previous, to = %state, "auth state transition");
        }
    }

    /* ---------------------------------------------------------------------- */
    /* Login / Logout */
    /* ---------------------------------------------------------------------- */

    /// Exchange credentials for tokens and persist the record
    ///
    /// # Errors
    /// - `Auth` when the backend rejects the credentials or omits tokens
    /// - `Network`/`Timeout` when the backend is unreachable
    /// - `Storage` when the record cannot be persisted
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        let body = serde_json::to_value(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let request = OutboundRequest::new(
            HttpMethod::Post,
            self.config.url_for(&self.config.endpoints.login),
            self.config.write_timeout(),
        )
        .header("Content-Type", "application/json")
        .json(body);

        let (response, _) = self.transport.send(request).await.map_err(|err| {
            warn!(error = %err, "login failed");
            err
        })?;

        let parsed: LoginResponse = serde_json::from_value(response.body).unwrap_or_default();
        let access = parsed
            .access
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Auth("login response missing access token".into()))?;
        let refresh = parsed
            .refresh
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Auth("login response missing refresh token".into()))?;
        let user = parsed
            .user
            .ok_or_else(|| ClientError::Auth("login response missing user".into()))?;

        let record = CredentialRecord {
            access_token: access,
            refresh_token: refresh,
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            last_validated_at: Some(self.clock.now()),
        };
        self.tokens.save(&record).await?;

        *self.profile.write() = Some(user.clone());
        self.set_state(AuthState::Authenticated);
        info!(user_id = user.id, "logged in");
        Ok(user)
    }

    /// Clear every credential key; never fails
    pub async fn logout(&self) {
        let failures = self.tokens.clear().await;
        if failures > 0 {
            warn!(failures, "logout left some credential keys behind");
        }
        *self.profile.write() = None;
        self.set_state(AuthState::Unauthenticated);
        info!("logged out");
    }

    /* ---------------------------------------------------------------------- */
    /* Status & Validation */
    /* ---------------------------------------------------------------------- */

    /// Startup check
    ///
    /// A record validated within the freshness window is trusted without a
    /// network call; otherwise the token is validated.
    pub async fn check_auth_status(&self) -> AuthState {
        let record = match self.tokens.load().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                *self.profile.write() = None;
                self.set_state(AuthState::Unauthenticated);
                return AuthState::Unauthenticated;
            }
            Err(err) => {
                warn!(error = %err, "credential record unreadable");
                *self.profile.write() = None;
                self.set_state(AuthState::Unauthenticated);
                return AuthState::Unauthenticated;
            }
        };

        if record.is_fresh(self.clock.now(), self.config.freshness_window()) {
            debug!("recent validation, skipping probe");
            *self.profile.write() = Some(record.profile());
            self.set_state(AuthState::Authenticated);
            return AuthState::Authenticated;
        }

        self.set_state(AuthState::Validating);
        self.validate_token().await;
        self.state()
    }

    /// Probe the backend with the stored access token
    ///
    /// A 401 triggers one refresh attempt; a failed refresh logs out. Any
    /// other failure leaves the stored tokens in place but reports the
    /// session as unauthenticated.
    #[instrument(skip(self))]
    pub async fn validate_token(&self) -> bool {
        let token = match self.tokens.access_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.set_state(AuthState::Unauthenticated);
                return false;
            }
            Err(err) => {
                warn!(error = %err, "access token unreadable");
                self.set_state(AuthState::Unauthenticated);
                return false;
            }
        };

        let request = OutboundRequest::new(
            HttpMethod::Get,
            self.config.url_for(&self.config.endpoints.validation),
            self.config.read_timeout(),
        )
        .header("Content-Type", "application/json")
        .bearer(&token);

        match self.transport.send(request).await {
            Ok(_) => {
                if let Err(err) = self.tokens.mark_validated(self.clock.now()).await {
                    warn!(error = %err, "could not record validation time");
                }
                self.restore_profile().await;
                self.set_state(AuthState::Authenticated);
                true
            }
            Err(ClientError::Auth(_)) => {
                debug!("access token rejected, attempting refresh");
                match self.refresh_access_token().await {
                    Ok(_) => {
                        self.restore_profile().await;
                        self.set_state(AuthState::Authenticated);
                        true
                    }
                    Err(err) => {
                        info!(error = %err, "refresh after rejection failed, logging out");
                        self.logout().await;
                        false
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "token validation inconclusive");
                self.set_state(AuthState::Unauthenticated);
                false
            }
        }
    }

    async fn restore_profile(&self) {
        if self.profile.read().is_some() {
            return;
        }
        if let Ok(Some(record)) = self.tokens.load().await {
            *self.profile.write() = Some(record.profile());
        }
    }

    /* ---------------------------------------------------------------------- */
    /* Refresh */
    /* ---------------------------------------------------------------------- */

    /// Obtain a new access token
    ///
    /// Concurrent callers share a single in-flight request and all observe
    /// its outcome.
    ///
    /// # Errors
    /// - `Auth("no refresh token")` when no refresh token is stored
    /// - `Auth("session expired")` when the backend rejects the refresh;
    ///   credentials are cleared
    /// - `Network`/`Timeout` without clearing credentials
    pub async fn refresh_access_token(&self) -> Result<String> {
        let (generation, refresh) = self.tokens.join_or_start_refresh(|| {
            let this = self.clone();
            async move { this.perform_refresh().await }.boxed()
        });

        let result = refresh.await;
        self.tokens.finish_refresh(generation);
        result
    }

    async fn perform_refresh(&self) -> Result<String> {
        let refresh_token = match self.tokens.refresh_token().await? {
            Some(token) if !token.is_empty() => token,
            _ => return Err(ClientError::Auth("no refresh token".into())),
        };

        let previous = self.state();
        self.set_state(AuthState::Refreshing);

        let body = serde_json::to_value(RefreshRequest { refresh: refresh_token })?;
        let request = OutboundRequest::new(
            HttpMethod::Post,
            self.config.url_for(&self.config.endpoints.refresh),
            self.config.write_timeout(),
        )
        .header("Content-Type", "application/json")
        .json(body);

        let response = match self.transport.send(request).await {
            Ok((response, _)) => response,
            Err(err) if err.is_http_response() => {
                info!(error = %err, "refresh rejected, clearing credentials");
                self.logout().await;
                return Err(ClientError::Auth("session expired".into()));
            }
            Err(err) => {
                warn!(error = %err, "refresh could not reach backend");
                self.set_state(previous);
                return Err(err);
            }
        };

        let parsed: RefreshResponse = serde_json::from_value(response.body).unwrap_or_default();
        let Some(access) = parsed.access.filter(|t| !t.is_empty()) else {
            self.set_state(previous);
            return Err(ClientError::Auth("refresh response missing access token".into()));
        };

        self.tokens.update_access_token(&access, self.clock.now()).await?;
        self.set_state(AuthState::Authenticated);
        info!("access token refreshed");
        Ok(access)
    }

    /* ---------------------------------------------------------------------- */
    /* Background validation */
    /* ---------------------------------------------------------------------- */

    /// Re-validate the stored token every `interval`
    ///
    /// The first validation happens one interval after the call. Abort the
    /// returned handle to stop the task.
    pub fn spawn_periodic_validation(&self, interval: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match this.tokens.load().await {
                    Ok(Some(_)) => {
                        if !this.validate_token().await {
                            info!("periodic validation failed");
                        }
                    }
                    Ok(None) => debug!("no credentials, skipping periodic validation"),
                    Err(err) => warn!(error = %err, "periodic validation could not read tokens"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use innoverse_domain::constants::{
        ACCESS_TOKEN_KEY, CREDENTIAL_KEYS, EMAIL_KEY, REFRESH_TOKEN_KEY, USERNAME_KEY, USER_ID_KEY,
    };
    use innoverse_domain::RequestConfig;
    use serde_json::json;

    use super::*;
    use crate::cache::ResponseCache;
    use crate::clock::MockClock;
    use crate::metrics::MetricsCollector;
    use crate::ports::KeyValueStore;
    use crate::request::ApiClient;
    use crate::storage::MemoryStore;
    use crate::testing::ScriptedExecutor;

    const LOGIN: &str = "/login/";
    const REFRESH: &str = "/auth/token/refresh";
    const PROFILE: &str = "/user/api/profile";

    struct Harness {
        manager: AuthManager,
        executor: Arc<ScriptedExecutor>,
        store: Arc<MemoryStore>,
        clock: MockClock,
    }

    fn harness_with(executor: ScriptedExecutor, store: Arc<MemoryStore>) -> Harness {
        let executor = Arc::new(executor);
        let clock = MockClock::at(chrono::Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let transport = Transport::new(executor.clone(), Arc::new(MetricsCollector::default()));
        let manager = AuthManager::new(
            transport,
            TokenStore::new(store.clone()),
            Arc::new(clock.clone()),
            Arc::new(ClientConfig::with_base_url("https://checkin.example.org")),
        );
        Harness { manager, executor, store, clock }
    }

    fn harness(executor: ScriptedExecutor) -> Harness {
        harness_with(executor, Arc::new(MemoryStore::new()))
    }

    fn login_body() -> serde_json::Value {
        json!({
            "access": "access-1",
            "refresh": "refresh-1",
            "user": {"id": 5, "username": "desk-a", "email": "desk-a@example.org"}
        })
    }

    /// Validates the login scenario.
    ///
    /// Assertions:
    /// - All six credential keys are persisted.
    /// - State becomes `Authenticated` and the profile is exposed.
    #[tokio::test]
    async fn test_login_persists_record() {
        let executor = ScriptedExecutor::new();
        executor.respond(HttpMethod::Post, LOGIN, login_body());
        let h = harness(executor);

        let profile = h.manager.login("desk-a", "secret").await.unwrap();

        assert_eq!(profile.id, 5);
        assert_eq!(h.manager.state(), AuthState::Authenticated);
        assert_eq!(h.manager.profile(), Some(profile));
        for key in CREDENTIAL_KEYS {
            assert!(h.store.get_item(key).await.unwrap().is_some(), "{key} missing");
        }
        let sent = &h.executor.calls()[0];
        assert_eq!(sent.body, Some(json!({"username": "desk-a", "password": "secret"})));
    }

    #[tokio::test]
    async fn test_login_failures_stay_unauthenticated() {
        let executor = ScriptedExecutor::new();
        executor
            .fail(HttpMethod::Post, LOGIN, ClientError::Auth("bad credentials".into()))
            .respond(HttpMethod::Post, LOGIN, json!({"detail": "ok but empty"}));
        let h = harness(executor);

        assert!(matches!(h.manager.login("u", "p").await, Err(ClientError::Auth(_))));
        assert!(matches!(h.manager.login("u", "p").await, Err(ClientError::Auth(_))));
        assert_eq!(h.manager.state(), AuthState::Unauthenticated);
        assert!(h.store.is_empty());
    }

    /// Validates that a fresh record is trusted without a network call.
    #[tokio::test]
    async fn test_check_auth_status_within_freshness_window() {
        let executor = ScriptedExecutor::new();
        executor.respond(HttpMethod::Post, LOGIN, login_body());
        let h = harness(executor);
        h.manager.login("desk-a", "secret").await.unwrap();

        h.clock.advance(Duration::from_secs(23 * 3600));
        let restarted = AuthManager::new(
            h.manager.transport.clone(),
            TokenStore::new(h.store.clone()),
            Arc::new(h.clock.clone()),
            h.manager.config.clone(),
        );

        assert_eq!(restarted.check_auth_status().await, AuthState::Authenticated);
        assert_eq!(restarted.profile().map(|p| p.username), Some("desk-a".to_string()));
        assert_eq!(h.executor.calls().len(), 1);
    }

    /// Validates the stale-record, rejected-token, successful-refresh path.
    ///
    /// Assertions:
    /// - Final state is `Authenticated`.
    /// - The stored access token is the refreshed one.
    /// - Exactly one probe and one refresh were sent.
    #[tokio::test]
    async fn test_stale_record_refreshes_after_401() {
        let executor = ScriptedExecutor::new();
        executor
            .respond(HttpMethod::Post, LOGIN, login_body())
            .fail(HttpMethod::Get, PROFILE, ClientError::Auth("expired".into()))
            .respond(HttpMethod::Post, REFRESH, json!({"access": "access-2"}));
        let h = harness(executor);
        h.manager.login("desk-a", "secret").await.unwrap();

        h.clock.advance(Duration::from_secs(25 * 3600));
        assert_eq!(h.manager.check_auth_status().await, AuthState::Authenticated);

        assert_eq!(h.store.get_item(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("access-2"));
        assert_eq!(h.executor.call_count(HttpMethod::Get, PROFILE), 1);
        assert_eq!(h.executor.call_count(HttpMethod::Post, REFRESH), 1);
        let refresh_call = h
            .executor
            .calls()
            .into_iter()
            .find(|c| c.url.ends_with(REFRESH))
            .unwrap();
        assert_eq!(refresh_call.body, Some(json!({"refresh": "refresh-1"})));
    }

    #[tokio::test]
    async fn test_rejected_refresh_logs_out() {
        let executor = ScriptedExecutor::new();
        executor
            .respond(HttpMethod::Post, LOGIN, login_body())
            .fail(HttpMethod::Get, PROFILE, ClientError::Auth("expired".into()))
            .fail(HttpMethod::Post, REFRESH, ClientError::Auth("refresh expired".into()));
        let h = harness(executor);
        h.manager.login("desk-a", "secret").await.unwrap();

        assert!(!h.manager.validate_token().await);
        assert_eq!(h.manager.state(), AuthState::Unauthenticated);
        assert_eq!(h.manager.profile(), None);
        assert!(h.store.is_empty());
    }

    /// Validates fail-closed handling of an inconclusive probe.
    #[tokio::test]
    async fn test_probe_server_error_keeps_tokens() {
        let executor = ScriptedExecutor::new();
        executor
            .respond(HttpMethod::Post, LOGIN, login_body())
            .fail(
                HttpMethod::Get,
                PROFILE,
                ClientError::Server { status: 503, message: "maintenance".into() },
            );
        let h = harness(executor);
        h.manager.login("desk-a", "secret").await.unwrap();

        assert!(!h.manager.validate_token().await);
        assert_eq!(h.manager.state(), AuthState::Unauthenticated);
        assert_eq!(h.store.get_item(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("access-1"));
        assert_eq!(h.executor.call_count(HttpMethod::Post, REFRESH), 0);
    }

    #[tokio::test]
    async fn test_refresh_without_token() {
        let h = harness(ScriptedExecutor::new());
        let err = h.manager.refresh_access_token().await.unwrap_err();
        assert_eq!(err, ClientError::Auth("no refresh token".into()));
        assert!(h.executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_transport_error_keeps_credentials() {
        let executor = ScriptedExecutor::new();
        executor
            .respond(HttpMethod::Post, LOGIN, login_body())
            .fail(HttpMethod::Post, REFRESH, ClientError::Timeout { after_ms: 15_000 });
        let h = harness(executor);
        h.manager.login("desk-a", "secret").await.unwrap();

        let err = h.manager.refresh_access_token().await.unwrap_err();
        assert_eq!(err, ClientError::Timeout { after_ms: 15_000 });
        assert_eq!(h.store.len(), 6);
        assert_eq!(h.manager.state(), AuthState::Authenticated);
    }

    /// Validates single-flight refresh.
    ///
    /// Assertions:
    /// - Ten concurrent callers produce exactly one refresh request.
    /// - Every caller observes the same new token.
    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_request() {
        let executor = ScriptedExecutor::new().with_delay(Duration::from_millis(50));
        executor
            .respond(HttpMethod::Post, LOGIN, login_body())
            .respond(HttpMethod::Post, REFRESH, json!({"access": "access-2"}));
        let h = harness(executor);
        h.manager.login("desk-a", "secret").await.unwrap();

        let callers: Vec<_> = (0..10)
            .map(|_| {
                let manager = h.manager.clone();
                tokio::spawn(async move { manager.refresh_access_token().await })
            })
            .collect();
        let results = futures::future::join_all(callers).await;

        for result in results {
            assert_eq!(result.unwrap().unwrap(), "access-2");
        }
        assert_eq!(h.executor.call_count(HttpMethod::Post, REFRESH), 1);

        // Slot is released; a later refresh goes out again.
        h.manager.refresh_access_token().await.unwrap();
        assert_eq!(h.executor.call_count(HttpMethod::Post, REFRESH), 2);
    }

    /// Store whose removals fail for one key and whose reads can be cut off.
    struct FaultyStore {
        inner: MemoryStore,
        sticky: Option<&'static str>,
        fail_reads: AtomicBool,
    }

    impl FaultyStore {
        fn new(sticky: Option<&'static str>) -> Self {
            Self { inner: MemoryStore::new(), sticky, fail_reads: AtomicBool::new(false) }
        }
    }

    #[async_trait]
    impl KeyValueStore for FaultyStore {
        async fn get_item(&self, key: &str) -> Result<Option<String>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(ClientError::Storage("database is locked".into()));
            }
            self.inner.get_item(key).await
        }
        async fn set_item(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set_item(key, value).await
        }
        async fn remove_item(&self, key: &str) -> Result<()> {
            if Some(key) == self.sticky {
                return Err(ClientError::Storage("locked".into()));
            }
            self.inner.remove_item(key).await
        }
        async fn multi_set(&self, entries: &[(String, String)]) -> Result<()> {
            self.inner.multi_set(entries).await
        }
        async fn multi_remove(&self, keys: &[String]) -> Result<()> {
            self.inner.multi_remove(keys).await
        }
        async fn all_keys(&self) -> Result<Vec<String>> {
            self.inner.all_keys().await
        }
    }

    fn manager_over(store: Arc<FaultyStore>) -> (AuthManager, TokenStore) {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond(HttpMethod::Post, LOGIN, login_body());
        let tokens = TokenStore::new(store);
        let manager = AuthManager::new(
            Transport::new(executor, Arc::new(MetricsCollector::default())),
            tokens.clone(),
            Arc::new(MockClock::new()),
            Arc::new(ClientConfig::with_base_url("https://checkin.example.org")),
        );
        (manager, tokens)
    }

    /// Validates logout resilience to a failing key removal.
    ///
    /// Assertions:
    /// - For each required key, logout completes and state is `Unauthenticated`.
    /// - The leftover key alone does not count as a record.
    #[tokio::test]
    async fn test_logout_with_failing_removal() {
        for sticky in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_ID_KEY, USERNAME_KEY, EMAIL_KEY] {
            let store = Arc::new(FaultyStore::new(Some(sticky)));
            let (manager, tokens) = manager_over(store.clone());
            manager.login("desk-a", "secret").await.unwrap();

            manager.logout().await;

            assert_eq!(manager.state(), AuthState::Unauthenticated, "sticky {sticky}");
            assert_eq!(manager.profile(), None);
            assert_eq!(store.inner.all_keys().await.unwrap(), vec![sticky.to_string()]);
            assert_eq!(tokens.load().await.unwrap(), None, "sticky {sticky}");
            assert_eq!(manager.check_auth_status().await, AuthState::Unauthenticated);
        }
    }

    /// Validates that an unreadable record drops the exposed profile.
    #[tokio::test]
    async fn test_unreadable_record_clears_profile() {
        let store = Arc::new(FaultyStore::new(None));
        let (manager, _) = manager_over(store.clone());
        manager.login("desk-a", "secret").await.unwrap();
        assert!(manager.profile().is_some());

        store.fail_reads.store(true, Ordering::SeqCst);

        assert_eq!(manager.check_auth_status().await, AuthState::Unauthenticated);
        assert_eq!(manager.profile(), None);
    }

    /// Validates fail-closed handling when validation never reaches the backend.
    ///
    /// Assertions:
    /// - Timeouts and network failures report `false` and `Unauthenticated`.
    /// - No refresh is attempted and all six stored keys survive.
    #[tokio::test]
    async fn test_validation_transport_errors_keep_tokens() {
        let failures = [
            ClientError::Timeout { after_ms: 10_000 },
            ClientError::Network("connection reset".into()),
        ];
        for failure in failures {
            let executor = ScriptedExecutor::new();
            executor
                .respond(HttpMethod::Post, LOGIN, login_body())
                .fail(HttpMethod::Get, PROFILE, failure.clone());
            let h = harness(executor);
            h.manager.login("desk-a", "secret").await.unwrap();

            assert!(!h.manager.validate_token().await, "{failure}");
            assert_eq!(h.manager.state(), AuthState::Unauthenticated);
            assert_eq!(h.store.len(), 6);
            assert_eq!(
                h.store.get_item(ACCESS_TOKEN_KEY).await.unwrap().as_deref(),
                Some("access-1")
            );
            assert_eq!(h.executor.call_count(HttpMethod::Post, REFRESH), 0);
        }
    }

    /// Validates that credential reads wait for an in-flight refresh.
    ///
    /// Assertions:
    /// - `current_access_token` issued mid-refresh returns the new token.
    /// - A request-layer GET issued mid-refresh carries the new bearer.
    #[tokio::test]
    async fn test_reads_during_refresh_see_new_token() {
        let executor = ScriptedExecutor::new().with_delay(Duration::from_millis(100));
        executor
            .respond(HttpMethod::Post, LOGIN, login_body())
            .respond(HttpMethod::Post, REFRESH, json!({"access": "access-2"}))
            .respond(HttpMethod::Get, "/api/info/Q/", json!({"allowed": true}));
        let h = harness(executor);
        h.manager.login("desk-a", "secret").await.unwrap();

        let api = ApiClient::new(
            h.manager.transport.clone(),
            Arc::new(ResponseCache::new(
                h.store.clone(),
                Arc::new(h.clock.clone()),
                Duration::from_secs(300),
            )),
            h.manager.tokens.clone(),
            Arc::new(h.clock.clone()),
            h.manager.config.clone(),
        );

        let refreshing = {
            let manager = h.manager.clone();
            tokio::spawn(async move { manager.refresh_access_token().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.manager.tokens.refresh_pending());

        let uncached = RequestConfig::uncached();
        let (token, response) = tokio::join!(
            h.manager.current_access_token(),
            api.get("/api/info/Q/", &uncached),
        );
        assert_eq!(token.unwrap().as_deref(), Some("access-2"));
        assert_eq!(response.unwrap().data, json!({"allowed": true}));
        assert_eq!(refreshing.await.unwrap().unwrap(), "access-2");

        let get_call =
            h.executor.calls().into_iter().find(|c| c.url.ends_with("/api/info/Q/")).unwrap();
        assert_eq!(get_call.header_value("Authorization"), Some("Bearer access-2"));
        assert_eq!(h.executor.call_count(HttpMethod::Post, REFRESH), 1);
    }

    #[tokio::test]
    async fn test_periodic_validation_runs_and_aborts() {
        let executor = ScriptedExecutor::new();
        executor
            .respond(HttpMethod::Post, LOGIN, login_body())
            .respond(HttpMethod::Get, PROFILE, json!({"id": 5}));
        let h = harness(executor);
        h.manager.login("desk-a", "secret").await.unwrap();

        let handle = h.manager.spawn_periodic_validation(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(110)).await;
        handle.abort();

        assert!(h.executor.call_count(HttpMethod::Get, PROFILE) >= 2);
        assert!(h.manager.is_authenticated());
    }
}
