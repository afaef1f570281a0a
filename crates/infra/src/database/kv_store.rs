//! SQLite implementation of the durable [`KeyValueStore`]

use std::sync::Arc;

use async_trait::async_trait;
use innoverse_core::KeyValueStore;
use innoverse_domain::Result;
use rusqlite::{params, OptionalExtension};

use super::manager::{DbManager, SqliteConnection};
use crate::errors::into_client_error;

const UPSERT_SQL: &str = "INSERT INTO kv_store (key, value, updated_at) \
     VALUES (?1, ?2, CAST(strftime('%s','now') AS INTEGER)) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

pub struct SqliteKeyValueStore {
    db: Arc<DbManager>,
}

impl SqliteKeyValueStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Run `op` on a pooled connection off the async runtime
    async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            op(&mut conn).map_err(into_client_error)
        })
        .await
        .map_err(into_client_error)?
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_connection(move |conn| conn.execute(UPSERT_SQL, params![key, value]).map(|_| ()))
            .await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key]).map(|_| ())
        })
        .await
    }

    /// All entries land in one transaction
    async fn multi_set(&self, entries: &[(String, String)]) -> Result<()> {
        let entries = entries.to_vec();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
                for (key, value) in &entries {
                    stmt.execute(params![key, value])?;
                }
            }
            tx.commit()
        })
        .await
    }

    async fn multi_remove(&self, keys: &[String]) -> Result<()> {
        let keys = keys.to_vec();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached("DELETE FROM kv_store WHERE key = ?1")?;
                for key in &keys {
                    stmt.execute(params![key])?;
                }
            }
            tx.commit()
        })
        .await
    }

    async fn all_keys(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
            let keys = stmt.query_map([], |row| row.get(0))?.collect::<rusqlite::Result<Vec<_>>>();
            keys
        })
        .await
    }
}
