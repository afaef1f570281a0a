//! Client facade
//!
//! [`InnoverseClient`] is the single entry point screens call into. It owns
//! the token lifecycle and the optimized request layer and exposes both
//! through one handle.

pub mod client;

pub use client::{InnoverseClient, InnoverseClientBuilder};
