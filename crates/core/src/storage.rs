//! In-memory [`KeyValueStore`] adapter
//!
//! Used when no durable store is configured and throughout the tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use innoverse_domain::Result;
use parking_lot::RwLock;

use crate::ports::KeyValueStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    async fn multi_set(&self, entries: &[(String, String)]) -> Result<()> {
        let mut items = self.items.write();
        for (key, value) in entries {
            items.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[String]) -> Result<()> {
        let mut items = self.items.write();
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }

    async fn all_keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store.set_item("access_token", "abc").await.unwrap();
            store
                .multi_set(&[("a".into(), "1".into()), ("b".into(), "2".into())])
                .await
                .unwrap();

            assert_eq!(store.get_item("access_token").await.unwrap().as_deref(), Some("abc"));
            assert_eq!(
                store.multi_get(&["a", "missing"]).await.unwrap(),
                vec![Some("1".to_string()), None]
            );

            store.multi_remove(&["a".into(), "b".into()]).await.unwrap();
            store.remove_item("never-set").await.unwrap();
            assert_eq!(store.all_keys().await.unwrap(), vec!["access_token".to_string()]);
        });
    }
}
