//! reqwest-backed [`RequestExecutor`]
//!
//! Applies the per-request deadline, classifies the response and produces
//! the metric for every call, including failed and timed-out ones.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use innoverse_core::{Clock, ExecutedResponse, Execution, OutboundRequest, RequestExecutor, SystemClock};
use innoverse_domain::constants::{LARGE_PAYLOAD_BYTES, REQUEST_START_HEADER, SLOW_REQUEST_MS};
use innoverse_domain::{ClientError, MetricStatus, RequestMetric, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{instrument, warn, Span};

use super::client::HttpClient;
use crate::errors::into_client_error;

pub struct HttpExecutor {
    client: HttpClient,
    clock: Arc<dyn Clock>,
}

impl HttpExecutor {
    pub fn new(client: HttpClient) -> Self {
        Self { client, clock: Arc::new(SystemClock) }
    }

    /// Executor with a default [`HttpClient`]
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(HttpClient::new()?))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Send the request and classify the response; returns the outcome and
    /// the response body size.
    async fn perform(&self, request: OutboundRequest) -> (Result<ExecutedResponse>, u64) {
        let deadline = request.timeout;
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = match self.client.send(builder).await {
            Ok(response) => response,
            Err(err) => return (Err(with_deadline(err, deadline)), 0),
        };

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"));

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return (Err(with_deadline(into_client_error(err), deadline)), 0),
        };

        (classify(status, is_json, &bytes), bytes.len() as u64)
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    #[instrument(
        name = "http.execute",
        skip(self, request),
        fields(method = %request.method, endpoint = tracing::field::Empty, status = tracing::field::Empty)
    )]
    async fn execute(&self, request: OutboundRequest) -> Execution {
        let started_at = self.clock.now();
        let request =
            request.header(REQUEST_START_HEADER, started_at.timestamp_millis().to_string());

        let endpoint = endpoint_label(&request.url);
        let method = request.method;
        let deadline = request.timeout;
        let request_bytes = request.size_bytes();
        Span::current().record("endpoint", tracing::field::display(&endpoint));

        let started = Instant::now();
        let (outcome, response_bytes) =
            match tokio::time::timeout(deadline, self.perform(request)).await {
                Ok(result) => result,
                Err(_) => (Err(ClientError::Timeout { after_ms: millis(deadline) }), 0),
            };
        let response_time_ms = millis(started.elapsed());

        let span = Span::current();
        match &outcome {
            Ok(response) => {
                span.record("status", response.status);
            }
            Err(err) => {
                span.record("status", tracing::field::display(err.kind()));
            }
        }

        if response_time_ms > SLOW_REQUEST_MS {
            warn!(endpoint = %endpoint, response_time_ms, "slow request");
        }
        if response_bytes > LARGE_PAYLOAD_BYTES {
            warn!(endpoint = %endpoint, response_bytes, "large response payload");
        }

        let metric = RequestMetric {
            endpoint,
            method: method.to_string(),
            response_time_ms,
            request_bytes,
            response_bytes,
            status: if outcome.is_ok() { MetricStatus::Success } else { MetricStatus::Failed },
            error_kind: outcome.as_ref().err().map(ClientError::kind),
            timestamp: started_at,
        };

        Execution { outcome, metric }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Timeouts raised by the HTTP client (connect or body read) report the
/// request deadline, same as the executor's own timer.
fn with_deadline(err: ClientError, deadline: Duration) -> ClientError {
    match err {
        ClientError::Timeout { .. } => ClientError::Timeout { after_ms: millis(deadline) },
        other => other,
    }
}

/// Path and query of `url`, used as the metric endpoint
fn endpoint_label(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

/// Map status, content type and body onto the client error taxonomy
///
/// 204/205 carry no body and resolve to `null`. Any other response that is
/// not `application/json` is a parse failure regardless of status.
pub(crate) fn classify(status: u16, is_json: bool, body: &[u8]) -> Result<ExecutedResponse> {
    if status == 204 || status == 205 {
        return Ok(ExecutedResponse { status, body: Value::Null });
    }

    if !is_json {
        return Err(ClientError::Parse(format!("server returned non-JSON response (status {status})")));
    }

    let parsed = if body.is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_slice::<Value>(body)
    };

    if (200..300).contains(&status) {
        return parsed
            .map(|body| ExecutedResponse { status, body })
            .map_err(|err| ClientError::Parse(format!("invalid JSON body: {err}")));
    }

    let body = parsed.unwrap_or(Value::Null);
    let message = error_message(status, &body);
    Err(match status {
        401 => ClientError::Auth(message),
        404 => ClientError::NotFound(message),
        400..=499 => ClientError::Validation {
            status,
            message,
            details: (!body.is_null()).then_some(body),
        },
        500..=599 => ClientError::Server { status, message },
        _ => ClientError::Network(format!("unexpected HTTP status {status}")),
    })
}

/// First of `detail`, `message` or `error` in an error body, falling back to
/// the status line
fn error_message(status: u16, body: &Value) -> String {
    for field in ["detail", "message", "error"] {
        match body.get(field) {
            Some(Value::String(text)) if !text.is_empty() => return text.clone(),
            Some(Value::Array(items)) if !items.is_empty() => {
                let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if !joined.is_empty() {
                    return joined.join(", ");
                }
            }
            _ => {}
        }
    }

    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("unknown status");
    format!("HTTP {status}: {reason}")
}
