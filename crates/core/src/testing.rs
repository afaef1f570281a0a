//! Test doubles for the request executor port
//!
//! Available to this crate's unit tests and, behind the `test-utils`
//! feature, to downstream crates.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use innoverse_domain::{
    ClientConfig, ClientError, HttpMethod, MetricStatus, RequestMetric, Result,
};
use parking_lot::Mutex;
use serde_json::Value;

use crate::auth::TokenStore;
use crate::cache::ResponseCache;
use crate::clock::MockClock;
use crate::metrics::MetricsCollector;
use crate::ports::{ExecutedResponse, Execution, OutboundRequest, RequestExecutor};
use crate::request::ApiClient;
use crate::storage::MemoryStore;
use crate::transport::Transport;

type Route = (HttpMethod, String);

/// Executor that answers from a per-route script
///
/// Routes are matched on method plus path-and-query. Each route holds a
/// queue of outcomes; the last outcome is sticky once the queue drains.
/// Unscripted routes fail with `NotFound`.
#[derive(Default)]
pub struct ScriptedExecutor {
    routes: Mutex<HashMap<Route, VecDeque<Result<Value>>>>,
    calls: Mutex<Vec<OutboundRequest>>,
    delay: Option<Duration>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful JSON body for `method path`
    pub fn respond(&self, method: HttpMethod, path: &str, body: Value) -> &Self {
        self.push(method, path, Ok(body))
    }

    /// Queue a failure for `method path`
    pub fn fail(&self, method: HttpMethod, path: &str, error: ClientError) -> &Self {
        self.push(method, path, Err(error))
    }

    fn push(&self, method: HttpMethod, path: &str, outcome: Result<Value>) -> &Self {
        self.routes.lock().entry((method, path.to_string())).or_default().push_back(outcome);
        self
    }

    /// Every request received so far, in arrival order
    pub fn calls(&self) -> Vec<OutboundRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: HttpMethod, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == method && path_and_query(&call.url) == path)
            .count()
    }

    fn next_outcome(&self, method: HttpMethod, path: &str) -> Result<Value> {
        let mut routes = self.routes.lock();
        match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => {
                queue.pop_front().unwrap_or_else(|| Err(ClientError::NotFound(path.to_string())))
            }
            Some(queue) => {
                queue.front().cloned().unwrap_or_else(|| Err(ClientError::NotFound(path.to_string())))
            }
            None => Err(ClientError::NotFound(path.to_string())),
        }
    }
}

#[async_trait]
impl RequestExecutor for ScriptedExecutor {
    async fn execute(&self, request: OutboundRequest) -> Execution {
        let started = Instant::now();
        let path = path_and_query(&request.url).to_string();
        self.calls.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.next_outcome(request.method, &path);
        let response_bytes = outcome.as_ref().map_or(0, |body| body.to_string().len() as u64);

        let metric = RequestMetric {
            endpoint: path,
            method: request.method.to_string(),
            response_time_ms: started.elapsed().as_millis() as u64,
            request_bytes: request.size_bytes(),
            response_bytes,
            status: if outcome.is_ok() { MetricStatus::Success } else { MetricStatus::Failed },
            error_kind: outcome.as_ref().err().map(ClientError::kind),
            timestamp: Utc::now(),
        };

        Execution { outcome: outcome.map(|body| ExecutedResponse { status: 200, body }), metric }
    }
}

/// Request layer wired to a scripted executor, an in-memory store and a
/// mock clock
pub struct Fixture {
    pub client: ApiClient,
    pub executor: Arc<ScriptedExecutor>,
    pub store: Arc<MemoryStore>,
    pub clock: MockClock,
}

/// Base URL used by [`fixture`]
pub const FIXTURE_BASE_URL: &str = "https://checkin.example.org";

pub fn fixture(executor: ScriptedExecutor) -> Fixture {
    let executor = Arc::new(executor);
    let store = Arc::new(MemoryStore::new());
    let clock = MockClock::new();
    let config = ClientConfig { prefetch_delay_ms: 10, ..ClientConfig::with_base_url(FIXTURE_BASE_URL) };
    let cache =
        Arc::new(ResponseCache::new(store.clone(), Arc::new(clock.clone()), config.cache_ttl()));
    let client = ApiClient::new(
        Transport::new(executor.clone(), Arc::new(MetricsCollector::default())),
        cache,
        TokenStore::new(store.clone()),
        Arc::new(clock.clone()),
        Arc::new(config),
    );
    Fixture { client, executor, store, clock }
}

/// `https://host/a/b?c=1` -> `/a/b?c=1`
pub fn path_and_query(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme.find('/').map_or("/", |idx| &without_scheme[idx..])
}
