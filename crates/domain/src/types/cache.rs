//! Response cache entry types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::CACHE_KEY_PREFIX;

/// Cached response body with its storage time and lifetime
///
/// Serialized form is the durable mirror format:
/// `{"data": <value>, "timestamp": <epoch ms>, "ttl": <ms>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    /// Epoch milliseconds at which the entry was stored
    pub timestamp: i64,
    /// Lifetime in milliseconds
    pub ttl: u64,
}

impl CacheEntry {
    pub fn new(data: Value, timestamp: i64, ttl: u64) -> Self {
        Self { data, timestamp, ttl }
    }

    /// Valid iff `now - timestamp < ttl`
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        let age = now_ms.saturating_sub(self.timestamp);
        age < 0 || (age as u64) < self.ttl
    }
}

/// Snapshot of the in-memory tier
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub in_memory_size: usize,
    pub memory_entries: Vec<String>,
}

/// Cache key for a request: `<METHOD>:<full url including query>`
pub fn cache_key(method: &str, url: &str) -> String {
    format!("{}:{}", method.to_uppercase(), url)
}

/// Durable mirror key for a cache key
pub fn durable_cache_key(key: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{key}")
}
