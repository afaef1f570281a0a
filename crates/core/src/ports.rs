//! Port interfaces for the client runtime
//!
//! These traits define the boundaries between the token/request logic in
//! this crate and the storage and HTTP adapters in `innoverse-infra`.

use std::time::Duration;

use async_trait::async_trait;
use innoverse_domain::{HttpMethod, RequestMetric, Result};
use serde_json::Value;

/* -------------------------------------------------------------------------- */
/* Durable Store */
/* -------------------------------------------------------------------------- */

/// Durable string key-value store
///
/// Shared by the token store and the response cache mirror.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read one key
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write one key
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete one key; deleting an absent key is not an error
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Write several keys at once
    async fn multi_set(&self, entries: &[(String, String)]) -> Result<()>;

    /// Delete several keys at once
    async fn multi_remove(&self, keys: &[String]) -> Result<()>;

    /// Every key currently stored
    async fn all_keys(&self) -> Result<Vec<String>>;

    /// Read several keys, positionally
    async fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get_item(key).await?);
        }
        Ok(values)
    }
}

/* -------------------------------------------------------------------------- */
/* Request Executor */
/* -------------------------------------------------------------------------- */

/// One fully-resolved HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    /// Absolute URL including query string
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl OutboundRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>, timeout: Duration) -> Self {
        Self { method, url: url.into(), headers: Vec::new(), body: None, timeout }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Σ(name + value + 4) over headers plus the serialized body length
    pub fn size_bytes(&self) -> u64 {
        let headers: usize = self.headers.iter().map(|(n, v)| n.len() + v.len() + 4).sum();
        let body = self.body.as_ref().map_or(0, |b| b.to_string().len());
        (headers + body) as u64
    }
}

/// Successful (2xx) JSON response
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedResponse {
    pub status: u16,
    /// Parsed body; `Null` for 204/205
    pub body: Value,
}

/// Outcome of one execution plus the metric describing it
///
/// The metric is produced whether or not the request succeeded.
#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: Result<ExecutedResponse>,
    pub metric: RequestMetric,
}

/// Performs one HTTP request with deadline, classification and measurement
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> Execution;
}
