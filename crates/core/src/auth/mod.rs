//! Authentication token lifecycle

pub mod manager;
pub mod token_store;

pub use manager::AuthManager;
pub use token_store::TokenStore;
