//! Network diagnostics
//!
//! Probes the auth token, runs individual endpoint probes (skipping the ones
//! that need a valid token when there is none), a batch of the eligible
//! probes, and optionally a paginated fetch.

use std::time::Duration;

use innoverse_domain::constants::DEFAULT_PAGE_SIZE;
use innoverse_domain::{
    BatchRequest, BatchStatus, ClientError, HttpMethod, MetricStatus, RequestConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::request::ApiClient;

const AUTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const BATCH_LABEL: &str = "batch";

/// One endpoint to probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub endpoint: String,
    pub description: String,
    pub requires_auth: bool,
}

impl Probe {
    pub fn public(endpoint: impl Into<String>, description: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), description: description.into(), requires_auth: false }
    }

    pub fn authenticated(endpoint: impl Into<String>, description: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), description: description.into(), requires_auth: true }
    }
}

/// What to probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsPlan {
    pub probes: Vec<Probe>,
    /// Endpoint fetched through the paginated path, if any
    pub paginated: Option<String>,
}

impl Default for DiagnosticsPlan {
    fn default() -> Self {
        Self {
            probes: vec![
                Probe::public("/api/reels/", "Reels Data"),
                Probe::public("/api/posts/", "Posts Data"),
                Probe::authenticated("/user/api/profile", "Profile Info"),
            ],
            paginated: Some("/api/reels/".to_string()),
        }
    }
}

/// Token state observed before probing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProbe {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub token_valid: bool,
    /// The validation probe was rejected with 401
    pub token_expired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub endpoint: String,
    pub description: String,
    pub status: MetricStatus,
    pub response_time_ms: u64,
    pub response_bytes: u64,
    pub cached: bool,
    pub error: Option<ClientError>,
}

impl ProbeResult {
    fn skipped(endpoint: &str, description: &str, reason: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            description: description.to_string(),
            status: MetricStatus::Skipped,
            response_time_ms: 0,
            response_bytes: 0,
            cached: false,
            error: Some(ClientError::Auth(reason.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProbe {
    pub status: BatchStatus,
    pub size: usize,
    pub succeeded: usize,
    /// Sum of the successful items' response sizes
    pub response_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub auth: AuthProbe,
    pub probes: Vec<ProbeResult>,
    pub batch: BatchProbe,
    pub paginated: Option<ProbeResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ApiClient {
    /// Check whether the stored token is accepted by the validation probe
    pub async fn probe_auth(&self) -> AuthProbe {
        let access = self.tokens.access_token().await.ok().flatten();
        let refresh = self.tokens.refresh_token().await.ok().flatten();
        let mut probe = AuthProbe {
            has_access_token: access.is_some(),
            has_refresh_token: refresh.is_some(),
            ..AuthProbe::default()
        };

        if probe.has_access_token {
            let options = RequestConfig::uncached().with_timeout(AUTH_PROBE_TIMEOUT);
            match self.get(&self.config.endpoints.validation, &options).await {
                Ok(_) => probe.token_valid = true,
                Err(err) => probe.token_expired = matches!(err, ClientError::Auth(_)),
            }
        }
        probe
    }

    /// Run the full diagnostics flow
    #[instrument(skip(self, plan), fields(probes = plan.probes.len()))]
    pub async fn run_diagnostics(&self, plan: &DiagnosticsPlan) -> DiagnosticsReport {
        let auth = self.probe_auth().await;
        let options = RequestConfig::uncached().with_timeout(self.config.read_timeout());

        let mut probes = Vec::with_capacity(plan.probes.len());
        for probe in &plan.probes {
            if probe.requires_auth && !auth.token_valid {
                self.record_skipped(&probe.endpoint, HttpMethod::Get);
                probes.push(ProbeResult::skipped(
                    &probe.endpoint,
                    &probe.description,
                    "authentication required",
                ));
                continue;
            }

            let result = match self.get(&probe.endpoint, &options).await {
                Ok(response) => ProbeResult {
                    endpoint: probe.endpoint.clone(),
                    description: probe.description.clone(),
                    status: MetricStatus::Success,
                    response_time_ms: response.metric.response_time_ms,
                    response_bytes: response.metric.response_bytes,
                    cached: response.cached,
                    error: None,
                },
                Err(err) => ProbeResult {
                    endpoint: probe.endpoint.clone(),
                    description: probe.description.clone(),
                    status: MetricStatus::Failed,
                    response_time_ms: 0,
                    response_bytes: 0,
                    cached: false,
                    error: Some(err),
                },
            };
            probes.push(result);
        }

        let batch = self.probe_batch(plan, &auth).await;

        let paginated = match &plan.paginated {
            Some(endpoint) => Some(self.probe_paginated(endpoint).await),
            None => None,
        };

        let mut report = DiagnosticsReport {
            auth,
            probes,
            batch,
            paginated,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        };
        report.tally();
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "diagnostics complete"
        );
        report
    }

    async fn probe_batch(&self, plan: &DiagnosticsPlan, auth: &AuthProbe) -> BatchProbe {
        let requests: Vec<BatchRequest> = plan
            .probes
            .iter()
            .filter(|probe| !probe.requires_auth || auth.token_valid)
            .map(|probe| BatchRequest::get(probe.endpoint.clone()))
            .collect();

        if requests.is_empty() {
            self.record_skipped(BATCH_LABEL, HttpMethod::Get);
            return BatchProbe { status: BatchStatus::Failed, size: 0, succeeded: 0, response_bytes: 0 };
        }

        let options = RequestConfig::uncached().with_timeout(self.config.write_timeout());
        let outcome = self.batch(requests, &options).await;
        let response_bytes = outcome
            .results
            .iter()
            .filter_map(|item| item.result.as_ref().ok())
            .map(|response| response.metric.response_bytes)
            .sum();

        BatchProbe {
            status: outcome.status,
            size: outcome.results.len(),
            succeeded: outcome.succeeded(),
            response_bytes,
        }
    }

    async fn probe_paginated(&self, endpoint: &str) -> ProbeResult {
        match self.get_paginated::<Value>(endpoint, 1, DEFAULT_PAGE_SIZE, true).await {
            Ok(response) => ProbeResult {
                endpoint: endpoint.to_string(),
                description: format!("Paginated Request ({} items)", response.data.results.len()),
                status: MetricStatus::Success,
                response_time_ms: response.metric.response_time_ms,
                response_bytes: response.metric.response_bytes,
                cached: response.cached,
                error: None,
            },
            Err(err) => ProbeResult {
                endpoint: endpoint.to_string(),
                description: "Paginated Request".to_string(),
                status: MetricStatus::Failed,
                response_time_ms: 0,
                response_bytes: 0,
                cached: false,
                error: Some(err),
            },
        }
    }
}

impl DiagnosticsReport {
    fn tally(&mut self) {
        let statuses = self.probes.iter().map(|p| p.status).chain(self.paginated.iter().map(|p| p.status));
        for status in statuses {
            match status {
                MetricStatus::Success => self.succeeded += 1,
                MetricStatus::Failed => self.failed += 1,
                MetricStatus::Skipped => self.skipped += 1,
            }
        }
        match (self.batch.size, self.batch.status) {
            (0, _) => self.skipped += 1,
            (_, BatchStatus::Failed) => self.failed += 1,
            _ => self.succeeded += 1,
        }
    }
}
