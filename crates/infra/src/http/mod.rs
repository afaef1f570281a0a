//! HTTP adapter
//!
//! [`HttpClient`] wraps reqwest; [`HttpExecutor`] implements the core
//! `RequestExecutor` port on top of it.

pub mod client;
pub mod executor;

pub use client::{HttpClient, HttpClientBuilder};
pub use executor::HttpExecutor;
