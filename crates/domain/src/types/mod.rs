//! Domain types and models

pub mod auth;
pub mod cache;
pub mod metrics;
pub mod page;
pub mod request;
pub mod responses;

pub use auth::{
    AuthState, CredentialRecord, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
    UserProfile,
};
pub use cache::{cache_key, durable_cache_key, CacheEntry, CacheStats};
pub use metrics::{MetricStatus, NetworkAnalytics, RequestMetric};
pub use page::Page;
pub use request::{
    ApiResponse, BatchItemResult, BatchOutcome, BatchRequest, BatchStatus, HttpMethod,
    RequestConfig,
};
pub use responses::{
    EntryResult, GenericCheck, GiftInventory, ParticipantInfo, ResponseVariant, TeamInfo,
    TeamMember,
};
