//! Configuration structures
//!
//! Populated by the infra config loader from environment variables or a
//! TOML/JSON file. Only the `trakt` section has no usable defaults.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_PATH, DEFAULT_DB_POOL_SIZE, DEFAULT_GRANT_TIMEOUT_SECS, DEFAULT_HTTP_PORT,
    DEFAULT_RESYNC_INTERVAL_SECS, DEFAULT_TOKEN_CHECK_INTERVAL_SECS,
    DEFAULT_TOKEN_REFRESH_MARGIN_SECS, TRAKT_API_URL,
};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub trakt: TraktConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// SQLite settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_PATH.to_string(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

/// Trakt client credentials and target lists
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraktConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Trakt username owning the lists.
    pub user: String,
    pub movie_list: String,
    pub show_list: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl fmt::Debug for TraktConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraktConfig")
            .field("client_id", &self.client_id)
            .field("user", &self.user)
            .field("movie_list", &self.movie_list)
            .field("show_list", &self.show_list)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

fn default_api_url() -> String {
    TRAKT_API_URL.to_string()
}

/// Webhook listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_HTTP_PORT }
    }
}

/// Notification channels. Empty means log-only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// HTTP(S) endpoints receiving `{"message": ...}` posts.
    pub urls: Vec<String>,
    pub pushover_app_token: Option<String>,
    pub pushover_user_key: Option<String>,
}

impl NotificationConfig {
    /// Both Pushover values, when configured and non-empty.
    pub fn pushover(&self) -> Option<(&str, &str)> {
        match (self.pushover_app_token.as_deref(), self.pushover_user_key.as_deref()) {
            (Some(token), Some(user)) if !token.is_empty() && !user.is_empty() => Some((token, user)),
            _ => None,
        }
    }
}

impl fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("urls", &self.urls.len())
            .field("pushover", &self.pushover().is_some())
            .finish()
    }
}

/// Background job settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub resync_enabled: bool,
    pub resync_interval_seconds: u64,
    pub token_refresh_margin_seconds: u64,
    pub token_check_interval_seconds: u64,
    /// Upper bound on a single device-code grant.
    pub grant_timeout_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            resync_enabled: false,
            resync_interval_seconds: DEFAULT_RESYNC_INTERVAL_SECS,
            token_refresh_margin_seconds: DEFAULT_TOKEN_REFRESH_MARGIN_SECS,
            token_check_interval_seconds: DEFAULT_TOKEN_CHECK_INTERVAL_SECS,
            grant_timeout_seconds: DEFAULT_GRANT_TIMEOUT_SECS,
        }
    }
}
