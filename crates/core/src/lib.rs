//! # Innoverse Core
//!
//! Token lifecycle and request-layer logic for the check-in client.
//!
//! This crate contains:
//! - Port interfaces for durable storage and HTTP execution
//! - The two-tier response cache and the metrics collector
//! - The token store and lifecycle manager
//! - The request layer (get/post/batch/pagination), check-in helpers and
//!   network diagnostics
//!
//! ## Architecture Principles
//! - Only depends on `innoverse-domain`
//! - No database or HTTP client code; adapters live in `innoverse-infra`
//! - All external effects via traits

pub mod auth;
pub mod cache;
pub mod checkin;
pub mod clock;
pub mod diagnostics;
pub mod metrics;
pub mod ports;
pub mod request;
pub mod storage;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use auth::{AuthManager, TokenStore};
pub use cache::ResponseCache;
pub use clock::{Clock, MockClock, SystemClock};
pub use diagnostics::{DiagnosticsPlan, DiagnosticsReport, Probe};
pub use metrics::MetricsCollector;
pub use ports::{ExecutedResponse, Execution, KeyValueStore, OutboundRequest, RequestExecutor};
pub use request::ApiClient;
pub use storage::MemoryStore;
pub use transport::Transport;
