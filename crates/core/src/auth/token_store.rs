//! Durable credential record over the key-value store

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use innoverse_domain::constants::{
    ACCESS_TOKEN_KEY, CREDENTIAL_KEYS, EMAIL_KEY, LAST_VALIDATION_KEY, REFRESH_TOKEN_KEY,
    USERNAME_KEY, USER_ID_KEY,
};
use innoverse_domain::{CredentialRecord, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::ports::KeyValueStore;

/// Refresh future shared by every caller that joins it
pub type SharedRefresh = Shared<BoxFuture<'static, Result<String>>>;

/// Reads and writes the credential record field-by-field
///
/// Also owns the in-flight refresh slot, so every holder of a clone
/// (the auth manager and the request layer alike) observes the same
/// pending refresh.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    /// In-flight refresh tagged with its generation
    pending: Arc<Mutex<Option<(u64, SharedRefresh)>>>,
    generation: Arc<AtomicU64>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /* ---------------------------------------------------------------------- */
    /* Pending refresh */
    /* ---------------------------------------------------------------------- */

    /// Join the in-flight refresh, or install `start()` as the new one
    ///
    /// Returns the generation to hand back to [`TokenStore::finish_refresh`].
    pub fn join_or_start_refresh(
        &self,
        start: impl FnOnce() -> BoxFuture<'static, Result<String>>,
    ) -> (u64, SharedRefresh) {
        let mut slot = self.pending.lock();
        if let Some((generation, refresh)) = slot.as_ref() {
            return (*generation, refresh.clone());
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let refresh = start().shared();
        *slot = Some((generation, refresh.clone()));
        (generation, refresh)
    }

    /// Release the slot if it still holds `generation`
    pub fn finish_refresh(&self, generation: u64) {
        let mut slot = self.pending.lock();
        if slot.as_ref().is_some_and(|(current, _)| *current == generation) {
            *slot = None;
        }
    }

    pub fn refresh_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    async fn await_pending_refresh(&self) {
        let pending = self.pending.lock().as_ref().map(|(_, refresh)| refresh.clone());
        if let Some(refresh) = pending {
            debug!("credential read waiting on in-flight refresh");
            if let Err(err) = refresh.await {
                debug!(error = %err, "in-flight refresh failed");
            }
        }
    }

    /* ---------------------------------------------------------------------- */
    /* Record */
    /* ---------------------------------------------------------------------- */

    /// Load the record; `None` unless all five required fields are present
    pub async fn load(&self) -> Result<Option<CredentialRecord>> {
        let values = self.store.multi_get(&CREDENTIAL_KEYS).await?;
        let [access, refresh, user_id, username, email, validated] =
            <[Option<String>; 6]>::try_from(values).unwrap_or_default();

        let (Some(access_token), Some(refresh_token), Some(user_id), Some(username), Some(email)) =
            (access, refresh, user_id, username, email)
        else {
            return Ok(None);
        };

        let Ok(user_id) = user_id.trim().parse::<i64>() else {
            warn!(user_id = %user_id, "stored user id is not numeric, treating record as absent");
            return Ok(None);
        };

        let last_validated_at = validated.as_deref().and_then(parse_timestamp);

        Ok(Some(CredentialRecord {
            access_token,
            refresh_token,
            user_id,
            username,
            email,
            last_validated_at,
        }))
    }

    /// Current access token without loading the rest of the record
    ///
    /// Waits for an in-flight refresh first so the caller never sees the
    /// token being replaced.
    pub async fn access_token(&self) -> Result<Option<String>> {
        self.await_pending_refresh().await;
        self.store.get_item(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>> {
        self.store.get_item(REFRESH_TOKEN_KEY).await
    }

    /// Persist the full record in a single `multi_set`
    pub async fn save(&self, record: &CredentialRecord) -> Result<()> {
        let mut entries = vec![
            (ACCESS_TOKEN_KEY.to_string(), record.access_token.clone()),
            (REFRESH_TOKEN_KEY.to_string(), record.refresh_token.clone()),
            (USER_ID_KEY.to_string(), record.user_id.to_string()),
            (USERNAME_KEY.to_string(), record.username.clone()),
            (EMAIL_KEY.to_string(), record.email.clone()),
        ];
        if let Some(validated) = record.last_validated_at {
            entries.push((LAST_VALIDATION_KEY.to_string(), format_timestamp(validated)));
        }
        self.store.multi_set(&entries).await
    }

    /// Replace the access token and stamp the validation time
    pub async fn update_access_token(&self, token: &str, validated_at: DateTime<Utc>) -> Result<()> {
        self.store
            .multi_set(&[
                (ACCESS_TOKEN_KEY.to_string(), token.to_string()),
                (LAST_VALIDATION_KEY.to_string(), format_timestamp(validated_at)),
            ])
            .await
    }

    pub async fn mark_validated(&self, at: DateTime<Utc>) -> Result<()> {
        self.store.set_item(LAST_VALIDATION_KEY, &format_timestamp(at)).await
    }

    /// Remove every credential key, one at a time
    ///
    /// Failures are logged and skipped so the remaining keys are still
    /// removed. Returns the number of keys that could not be removed.
    pub async fn clear(&self) -> usize {
        let mut failures = 0;
        for key in CREDENTIAL_KEYS {
            if let Err(err) = self.store.remove_item(key).await {
                failures += 1;
                warn!(key, error = %err, "failed to remove credential key");
            }
        }
        debug!(failures, "credential record cleared");
        failures
    }
}

/// Validation timestamps are stored as epoch milliseconds
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.timestamp_millis().to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}
