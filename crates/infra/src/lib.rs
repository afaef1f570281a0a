//! # Innoverse Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The reqwest-backed request executor
//! - The SQLite key-value store (rusqlite + r2d2)
//! - Configuration loading and tracing setup
//! - The `InnoverseClient` facade wiring everything together
//!
//! ## Architecture
//! - Implements traits defined in `innoverse-core`
//! - Depends on `innoverse-domain` and `innoverse-core`
//! - Contains all "impure" code (network, disk, environment)

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{InnoverseClient, InnoverseClientBuilder};
pub use database::{DbManager, SqliteKeyValueStore};
pub use errors::InfraError;
pub use http::{HttpClient, HttpExecutor};
pub use observability::{init_tracing, LogFormat};
