pub mod conversions;

pub use conversions::{into_client_error, InfraError};
