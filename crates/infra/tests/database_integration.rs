//! Integration tests for the SQLite key-value store
//!
//! Exercises the store through the core `KeyValueStore` port, the way the
//! token store and response cache use it.

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use innoverse_core::{KeyValueStore, TokenStore};
use innoverse_domain::CredentialRecord;
use support::TestBackend;

fn record() -> CredentialRecord {
    CredentialRecord {
        access_token: "acc".into(),
        refresh_token: "ref".into(),
        user_id: 7,
        username: "gatekeeper".into(),
        email: "gate@example.org".into(),
        last_validated_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()),
    }
}

#[tokio::test]
async fn token_store_roundtrip_over_sqlite() {
    let backend = TestBackend::start().await;
    let tokens = TokenStore::new(Arc::new(backend.store()));

    tokens.save(&record()).await.unwrap();
    assert_eq!(tokens.load().await.unwrap(), Some(record()));

    assert_eq!(tokens.clear().await, 0);
    assert_eq!(tokens.load().await.unwrap(), None);
}

#[tokio::test]
async fn partial_record_loads_as_absent() {
    let backend = TestBackend::start().await;
    let store = Arc::new(backend.store());
    let tokens = TokenStore::new(store.clone());

    tokens.save(&record()).await.unwrap();
    store.remove_item("refresh_token").await.unwrap();

    assert_eq!(tokens.load().await.unwrap(), None);
}

#[tokio::test]
async fn concurrent_writers_do_not_lose_updates() {
    let backend = TestBackend::start().await;
    let store = Arc::new(backend.store());

    let writers: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store.set_item(&format!("cache_GET:https://h/item/{i}"), "{}").await
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    assert_eq!(store.all_keys().await.unwrap().len(), 16);
    backend.db.health_check().unwrap();
}
