//! Authentication types: credential record, profile, wire payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/* -------------------------------------------------------------------------- */
/* Credential Record */
/* -------------------------------------------------------------------------- */

/// Durable credential record
///
/// Persisted field-by-field under the credential keys. A record with any of
/// the five required fields missing is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    /// Time of the last successful validation or refresh
    pub last_validated_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile { id: self.user_id, username: self.username.clone(), email: self.email.clone() }
    }

    /// True when the last validation happened less than `window` before `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, window: std::time::Duration) -> bool {
        let Some(validated) = self.last_validated_at else {
            return false;
        };
        let Ok(window) = chrono::Duration::from_std(window) else {
            return false;
        };
        now.signed_duration_since(validated) < window
    }
}

/// User identity exposed to screens after login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/* -------------------------------------------------------------------------- */
/* Auth State */
/* -------------------------------------------------------------------------- */

/// Token lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated,
    Validating,
    Refreshing,
}

impl_domain_status_conversions!(AuthState {
    Unauthenticated => "unauthenticated",
    Authenticated => "authenticated",
    Validating => "validating",
    Refreshing => "refreshing",
});

/* -------------------------------------------------------------------------- */
/* Wire Payloads */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /login/` response
///
/// Fields are optional so a malformed body surfaces as an auth failure
/// instead of a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// `POST /auth/token/refresh` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub access: Option<String>,
}
