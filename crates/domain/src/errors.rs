//! Error types used throughout the client runtime

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::impl_domain_status_conversions;

/// Main error type for the client runtime
///
/// Transport and parsing failures are classified once, at the request
/// executor boundary, and travel unchanged up to the screens.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        /// Structured error payload returned by the server, when present
        details: Option<Value>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification recorded alongside request metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    Auth,
    Validation,
    NotFound,
    Server,
    Parse,
    Storage,
    Config,
}

impl_domain_status_conversions!(ErrorKind {
    Network => "network",
    Timeout => "timeout",
    Auth => "auth",
    Validation => "validation",
    NotFound => "not_found",
    Server => "server",
    Parse => "parse",
    Storage => "storage",
    Config => "config",
});

impl ClientError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Server { .. } => ErrorKind::Server,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// HTTP status carried by the error, if it came from a server response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server answered with an error status, as opposed to the
    /// request never completing.
    pub fn is_http_response(&self) -> bool {
        self.status().is_some()
    }

    /// True for failures of the transport itself (including deadline expiry)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for client runtime operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ClientError::Network("down".into()).kind(), ErrorKind::Network);
        assert_eq!(ClientError::Timeout { after_ms: 10 }.kind(), ErrorKind::Timeout);
        assert_eq!(ClientError::Auth("bad".into()).kind(), ErrorKind::Auth);
        assert_eq!(
            ClientError::Server { status: 502, message: "bad gateway".into() }.kind(),
            ErrorKind::Server
        );
    }

    #[test]
    fn test_status_and_transport_flags() {
        let validation = ClientError::Validation {
            status: 422,
            message: "invalid".into(),
            details: Some(json!({"qr": ["unknown code"]})),
        };
        assert_eq!(validation.status(), Some(422));
        assert!(validation.is_http_response());
        assert!(!validation.is_transport());

        let timeout = ClientError::Timeout { after_ms: 10_000 };
        assert_eq!(timeout.status(), None);
        assert!(timeout.is_transport());
    }

    #[test]
    fn test_timeout_display_is_distinct() {
        let err = ClientError::Timeout { after_ms: 15_000 };
        assert_eq!(err.to_string(), "Request timed out after 15000ms");
    }

    #[test]
    fn test_error_kind_strings() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!("TIMEOUT".parse::<ErrorKind>(), Ok(ErrorKind::Timeout));
    }

    #[test]
    fn test_serde_tagging() {
        let err = ClientError::NotFound("/api/info/x/".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, json!({"type": "NotFound", "detail": "/api/info/x/"}));
    }
}
