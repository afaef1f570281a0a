//! Application constants
//!
//! Durable storage keys and default tunables shared by the runtime.

// Credential record keys
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_ID_KEY: &str = "user_id";
pub const USERNAME_KEY: &str = "username";
pub const EMAIL_KEY: &str = "email";
pub const LAST_VALIDATION_KEY: &str = "last_token_validation";

/// Every key owned by the credential record, in removal order
pub const CREDENTIAL_KEYS: [&str; 6] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    USER_ID_KEY,
    USERNAME_KEY,
    EMAIL_KEY,
    LAST_VALIDATION_KEY,
];

/// Prefix of durable cache mirror keys (`cache_GET:<url>`)
pub const CACHE_KEY_PREFIX: &str = "cache_";

// Request defaults
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_METRICS_WINDOW: usize = 50;
pub const DEFAULT_PREFETCH_DELAY_MS: u64 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// Analytics thresholds
pub const SLOW_REQUEST_MS: u64 = 1_000;
pub const LARGE_PAYLOAD_BYTES: u64 = 100 * 1024;
pub const ANALYTICS_RECENT_COUNT: usize = 10;

// Backend endpoints
pub const DEFAULT_LOGIN_PATH: &str = "/login/";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/token/refresh";
pub const DEFAULT_VALIDATION_PATH: &str = "/user/api/profile";

// Headers
pub const REQUEST_START_HEADER: &str = "X-Request-Start";
pub const MINIFY_RESPONSE_HEADER: &str = "X-Minify-Response";
