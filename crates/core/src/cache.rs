//! Two-tier TTL response cache
//!
//! The in-memory map is authoritative for the process lifetime. Every write
//! is mirrored to the durable store under `cache_<key>` so entries survive a
//! restart; a memory miss falls back to the mirror and repopulates memory.
//!
//! The cache is advisory: store and parse failures are logged and reported as
//! misses, never as errors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use innoverse_domain::constants::CACHE_KEY_PREFIX;
use innoverse_domain::{durable_cache_key, CacheEntry, CacheStats};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::ports::KeyValueStore;

pub struct ResponseCache {
    memory: RwLock<HashMap<String, CacheEntry>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self { memory: RwLock::new(HashMap::new()), store, clock, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Valid cached value for `key`, if any
    pub async fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.millis_since_epoch();

        let memory_hit = self.memory.read().get(key).cloned();
        if let Some(entry) = memory_hit {
            if entry.is_valid_at(now) {
                debug!(key, "cache hit (memory)");
                return Some(entry.data);
            }
            debug!(key, "cache entry expired");
            self.remove(key).await;
            return None;
        }

        let durable_key = durable_cache_key(key);
        let raw = match self.store.get_item(&durable_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "corrupt cache entry, discarding");
                self.remove_durable(&durable_key).await;
                return None;
            }
        };

        if !entry.is_valid_at(now) {
            debug!(key, "durable cache entry expired");
            self.remove_durable(&durable_key).await;
            return None;
        }

        debug!(key, "cache hit (durable)");
        let data = entry.data.clone();
        self.memory.write().insert(key.to_string(), entry);
        Some(data)
    }

    /// Store `value` under `key` in both tiers
    pub async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry =
            CacheEntry::new(value, self.clock.millis_since_epoch(), ttl.as_millis() as u64);

        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => Some(s),
            Err(err) => {
                warn!(key, error = %err, "cache entry not serializable, memory only");
                None
            }
        };

        self.memory.write().insert(key.to_string(), entry);

        if let Some(serialized) = serialized {
            if let Err(err) = self.store.set_item(&durable_cache_key(key), &serialized).await {
                warn!(key, error = %err, "cache write-through failed");
            }
        }
    }

    /// Drop `key` from both tiers
    pub async fn remove(&self, key: &str) {
        self.memory.write().remove(key);
        self.remove_durable(&durable_cache_key(key)).await;
    }

    async fn remove_durable(&self, durable_key: &str) {
        if let Err(err) = self.store.remove_item(durable_key).await {
            warn!(key = durable_key, error = %err, "cache delete failed");
        }
    }

    /// Empty memory and remove every durable `cache_` key
    ///
    /// Credential keys share the store and are left untouched.
    pub async fn clear(&self) {
        self.memory.write().clear();

        let keys = match self.store.all_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "cache clear could not list durable keys");
                return;
            }
        };

        let cache_keys: Vec<String> =
            keys.into_iter().filter(|k| k.starts_with(CACHE_KEY_PREFIX)).collect();
        if cache_keys.is_empty() {
            return;
        }
        if let Err(err) = self.store.multi_remove(&cache_keys).await {
            warn!(error = %err, count = cache_keys.len(), "cache clear failed");
        } else {
            debug!(count = cache_keys.len(), "durable cache cleared");
        }
    }

    /// In-memory tier snapshot
    pub fn stats(&self) -> CacheStats {
        let memory = self.memory.read();
        let mut memory_entries: Vec<String> = memory.keys().cloned().collect();
        memory_entries.sort();
        CacheStats { in_memory_size: memory.len(), memory_entries }
    }
}
