//! Conversions from external infrastructure errors into domain errors.

use innoverse_domain::ClientError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use thiserror::Error;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(#[from] pub ClientError);

impl From<InfraError> for ClientError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

/// Shorthand for `ClientError::from(InfraError::from(err))`
pub fn into_client_error<E>(err: E) -> ClientError
where
    InfraError: From<E>,
{
    InfraError::from(err).into()
}

trait IntoClientError {
    fn into_client(self) -> ClientError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → ClientError */
/* -------------------------------------------------------------------------- */

impl IntoClientError for SqlError {
    fn into_client(self) -> ClientError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => ClientError::Storage("database is busy".into()),
                    ErrorCode::DatabaseLocked => ClientError::Storage("database is locked".into()),
                    ErrorCode::ReadOnly => ClientError::Storage("database is read-only".into()),
                    ErrorCode::DiskFull => ClientError::Storage("disk is full".into()),
                    ErrorCode::CannotOpen => {
                        ClientError::Storage(format!("unable to open database: {message}"))
                    }
                    _ => ClientError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => ClientError::Storage("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                ClientError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                ClientError::Storage(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => ClientError::Storage(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => ClientError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_client())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → ClientError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(ClientError::Storage(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → ClientError */
/* -------------------------------------------------------------------------- */

impl From<tokio::task::JoinError> for InfraError {
    fn from(value: tokio::task::JoinError) -> Self {
        InfraError(ClientError::Storage(format!("blocking storage task failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ClientError */
/* -------------------------------------------------------------------------- */

impl IntoClientError for HttpError {
    fn into_client(self) -> ClientError {
        // reqwest does not report how long it waited; the executor stamps
        // the request deadline on its way out.
        if self.is_timeout() {
            return ClientError::Timeout { after_ms: 0 };
        }

        if self.is_connect() {
            return ClientError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_decode() {
            return ClientError::Parse(format!("failed to decode response body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 => ClientError::Auth(message),
                404 => ClientError::NotFound(message),
                400..=499 => ClientError::Validation { status: code, message, details: None },
                500..=599 => ClientError::Server { status: code, message },
                _ => ClientError::Network(message),
            };
        }

        if self.is_builder() {
            return ClientError::Config(format!("invalid request: {self}"));
        }

        ClientError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_client())
    }
}

/* -------------------------------------------------------------------------- */
/* Configuration parse errors → ClientError */
/* -------------------------------------------------------------------------- */

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(ClientError::Config(format!("Invalid TOML format: {value}")))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError(ClientError::Config(format!("Invalid URL: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
