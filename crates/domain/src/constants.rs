//! Application constants
//!
//! Centralized location for the fixed values shared by the adapters and the
//! binary.

// Trakt API
pub const TRAKT_API_URL: &str = "https://api.trakt.tv";
pub const TRAKT_API_VERSION: &str = "2";
pub const TRAKT_API_KEY_HEADER: &str = "trakt-api-key";
pub const TRAKT_API_VERSION_HEADER: &str = "trakt-api-version";
pub const OAUTH_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
pub const REFRESH_GRANT_TYPE: &str = "refresh_token";

// HTTP transport (fixed, not per request)
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const HTTP_IDLE_TIMEOUT_SECS: u64 = 5;

/// Extra delay added to the poll interval when the server asks us to slow down.
pub const DEVICE_POLL_SLOW_DOWN_SECS: u64 = 5;

// Process defaults
pub const DEFAULT_HTTP_PORT: u16 = 8686;
pub const DEFAULT_DB_PATH: &str = "overtrakt.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_TOKEN_REFRESH_MARGIN_SECS: u64 = 86_400;
pub const DEFAULT_TOKEN_CHECK_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_GRANT_TIMEOUT_SECS: u64 = 900;

// Notifications
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";
pub const ACTION_REQUIRED_MESSAGE: &str = "Action required: authentication requires intervention.";
