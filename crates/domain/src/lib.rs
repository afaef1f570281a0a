//! # Innoverse Domain
//!
//! Data model for the check-in client runtime.
//!
//! This crate contains:
//! - Credential, cache, metric and request types
//! - Classified backend response shapes
//! - The client error taxonomy and Result definition
//! - Configuration structures and storage-key constants
//!
//! ## Architecture
//! - No dependencies on other Innoverse crates
//! - No I/O; pure data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
