//! Optimized request layer

pub mod batch;
pub mod client;
pub mod minify;
pub mod pagination;

pub use client::ApiClient;
pub use minify::minify;
pub use pagination::paginated_endpoint;
