//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If any mandatory variable is missing, falls back to a config file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Mandatory:
//! - `TRAKT_CLIENT_ID`, `TRAKT_CLIENT_SECRET`: OAuth application credentials
//! - `TRAKT_USER`: Owner of the target lists
//! - `TRAKT_MOVIE_LIST`, `TRAKT_TVSHOW_LIST`: List slugs per media kind
//!
//! Optional:
//! - `TRAKT_API_URL`: API base URL (default `https://api.trakt.tv`)
//! - `DATABASE_PATH`, `DATABASE_POOL_SIZE`: SQLite file and pool size
//! - `HTTP_PORT`: Webhook listener port (default 8686)
//! - `NOTIFICATION_URLS`: Space-separated http(s) webhook URLs receiving
//!   `{"message": ...}`. Shoutrrr service URLs (`discord://`, ...) are skipped
//! - `PUSHOVER_APP_TOKEN`, `PUSHOVER_USER_KEY`: Pushover credentials
//! - `RESYNC_ENABLED`, `RESYNC_INTERVAL_SECONDS`: Periodic ledger replay
//! - `TOKEN_REFRESH_MARGIN_SECONDS`, `TOKEN_CHECK_INTERVAL_SECONDS`:
//!   Proactive token refresh
//! - `AUTH_GRANT_TIMEOUT_SECONDS`: Upper bound on one device-code grant
//!
//! ## File Locations
//! The loader probes `config.{json,toml}` and `overtrakt.{json,toml}` in the
//! current directory, its parents (up to 2 levels) and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use overtrakt_domain::{
    Config, DatabaseConfig, NotificationConfig, OvertraktError, Result, SchedulerConfig,
    ServerConfig, TraktConfig,
};

const REQUIRED_KEYS: [&str; 5] =
    ["TRAKT_CLIENT_ID", "TRAKT_CLIENT_SECRET", "TRAKT_USER", "TRAKT_MOVIE_LIST", "TRAKT_TVSHOW_LIST"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `OvertraktError::Config` if neither source yields a complete
/// configuration. The environment error is returned when no file exists, so
/// the operator sees which keys are missing.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(env_err) => {
            tracing::debug!(error = %env_err, "Failed to load from environment, trying file");
            match probe_config_paths() {
                Some(path) => load_from_file(Some(path)),
                None => Err(env_err),
            }
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `OvertraktError::Config` listing every missing mandatory key, or
/// naming the first optional value that fails to parse.
pub fn load_from_env() -> Result<Config> {
    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| std::env::var(key).map_or(true, |value| value.trim().is_empty()))
        .collect();
    if !missing.is_empty() {
        return Err(OvertraktError::Config(format!(
            "Missing required environment variables: {}",
            missing.join(", ")
        )));
    }

    let defaults = SchedulerConfig::default();
    let database = DatabaseConfig::default();

    Ok(Config {
        database: DatabaseConfig {
            path: env_opt("DATABASE_PATH").unwrap_or(database.path),
            pool_size: env_parse("DATABASE_POOL_SIZE", database.pool_size)?,
        },
        trakt: TraktConfig {
            client_id: env_var("TRAKT_CLIENT_ID")?,
            client_secret: env_var("TRAKT_CLIENT_SECRET")?,
            user: env_var("TRAKT_USER")?,
            movie_list: env_var("TRAKT_MOVIE_LIST")?,
            show_list: env_var("TRAKT_TVSHOW_LIST")?,
            api_url: env_opt("TRAKT_API_URL")
                .unwrap_or_else(|| overtrakt_domain::constants::TRAKT_API_URL.to_string()),
        },
        server: ServerConfig { port: env_parse("HTTP_PORT", ServerConfig::default().port)? },
        notifications: NotificationConfig {
            urls: env_opt("NOTIFICATION_URLS")
                .map(|urls| urls.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            pushover_app_token: env_opt("PUSHOVER_APP_TOKEN"),
            pushover_user_key: env_opt("PUSHOVER_USER_KEY"),
        },
        scheduler: SchedulerConfig {
            resync_enabled: env_bool("RESYNC_ENABLED", defaults.resync_enabled),
            resync_interval_seconds: env_parse(
                "RESYNC_INTERVAL_SECONDS",
                defaults.resync_interval_seconds,
            )?,
            token_refresh_margin_seconds: env_parse(
                "TOKEN_REFRESH_MARGIN_SECONDS",
                defaults.token_refresh_margin_seconds,
            )?,
            token_check_interval_seconds: env_parse(
                "TOKEN_CHECK_INTERVAL_SECONDS",
                defaults.token_check_interval_seconds,
            )?,
            grant_timeout_seconds: env_parse(
                "AUTH_GRANT_TIMEOUT_SECONDS",
                defaults.grant_timeout_seconds,
            )?,
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `OvertraktError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(OvertraktError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            OvertraktError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| OvertraktError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, format chosen by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| OvertraktError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| OvertraktError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(OvertraktError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["config.json", "config.toml", "overtrakt.json", "overtrakt.toml"];
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.extend([exe_dir.clone(), exe_dir.join("..")]);
    }

    roots
        .iter()
        .flat_map(|root| NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        OvertraktError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Non-empty, trimmed environment variable.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an optional environment variable, falling back to `default`.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key).map_or(Ok(default), |raw| {
        raw.parse::<T>().map_err(|e| OvertraktError::Config(format!("Invalid {key} ({raw}): {e}")))
    })
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const OPTIONAL_KEYS: [&str; 12] = [
        "TRAKT_API_URL",
        "DATABASE_PATH",
        "DATABASE_POOL_SIZE",
        "HTTP_PORT",
        "NOTIFICATION_URLS",
        "PUSHOVER_APP_TOKEN",
        "PUSHOVER_USER_KEY",
        "RESYNC_ENABLED",
        "RESYNC_INTERVAL_SECONDS",
        "TOKEN_REFRESH_MARGIN_SECONDS",
        "TOKEN_CHECK_INTERVAL_SECONDS",
        "AUTH_GRANT_TIMEOUT_SECONDS",
    ];

    fn clear_env() {
        for key in REQUIRED_KEYS.iter().chain(OPTIONAL_KEYS.iter()) {
            std::env::remove_var(key);
        }
    }

    fn set_required() {
        std::env::set_var("TRAKT_CLIENT_ID", "client");
        std::env::set_var("TRAKT_CLIENT_SECRET", "secret");
        std::env::set_var("TRAKT_USER", "someone");
        std::env::set_var("TRAKT_MOVIE_LIST", "movies");
        std::env::set_var("TRAKT_TVSHOW_LIST", "shows");
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for (value, expected) in [("1", true), ("TRUE", true), ("on", true), ("no", false), ("0", false)] {
            std::env::set_var("OVERTRAKT_TEST_BOOL", value);
            assert_eq!(env_bool("OVERTRAKT_TEST_BOOL", !expected), expected, "value {value}");
        }

        std::env::remove_var("OVERTRAKT_TEST_BOOL");
        assert!(env_bool("OVERTRAKT_TEST_BOOL", true));
    }

    #[test]
    fn test_load_from_env_uses_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();

        let config = load_from_env().expect("config loads");

        assert_eq!(config.trakt.client_id, "client");
        assert_eq!(config.trakt.show_list, "shows");
        assert_eq!(config.trakt.api_url, "https://api.trakt.tv");
        assert_eq!(config.server.port, 8686);
        assert_eq!(config.database.path, "overtrakt.db");
        assert!(!config.scheduler.resync_enabled);
        assert!(config.notifications.urls.is_empty());

        clear_env();
    }

    #[test]
    fn test_load_from_env_reads_optional_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();
        std::env::set_var("HTTP_PORT", "9000");
        std::env::set_var("NOTIFICATION_URLS", "http://a/1  http://b/2");
        std::env::set_var("PUSHOVER_APP_TOKEN", "app");
        std::env::set_var("PUSHOVER_USER_KEY", "user");
        std::env::set_var("RESYNC_ENABLED", "yes");
        std::env::set_var("RESYNC_INTERVAL_SECONDS", "60");
        std::env::set_var("AUTH_GRANT_TIMEOUT_SECONDS", "120");

        let config = load_from_env().expect("config loads");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.notifications.urls, ["http://a/1", "http://b/2"]);
        assert_eq!(config.notifications.pushover(), Some(("app", "user")));
        assert!(config.scheduler.resync_enabled);
        assert_eq!(config.scheduler.resync_interval_seconds, 60);
        assert_eq!(config.scheduler.grant_timeout_seconds, 120);

        clear_env();
    }

    #[test]
    fn test_load_from_env_lists_every_missing_key() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("TRAKT_CLIENT_ID", "client");
        std::env::set_var("TRAKT_USER", "  ");

        let err = load_from_env().unwrap_err();

        match err {
            OvertraktError::Config(msg) => {
                assert!(msg.contains("TRAKT_CLIENT_SECRET"));
                assert!(msg.contains("TRAKT_USER"));
                assert!(msg.contains("TRAKT_TVSHOW_LIST"));
                assert!(!msg.contains("TRAKT_CLIENT_ID"));
            }
            other => panic!("expected config error, got {other:?}"),
        }

        clear_env();
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();
        std::env::set_var("HTTP_PORT", "not-a-port");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, OvertraktError::Config(msg) if msg.contains("HTTP_PORT")));

        clear_env();
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[trakt]
client_id = "id"
client_secret = "secret"
user = "me"
movie_list = "movies"
show_list = "shows"

[server]
port = 9100
"#
        )
        .unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).expect("toml parses");

        assert_eq!(config.trakt.user, "me");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.database.pool_size, 4);
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"trakt": {{"client_id": "id", "client_secret": "s", "user": "me",
                "movie_list": "m", "show_list": "s"}},
               "scheduler": {{"resync_enabled": true}}}}"#
        )
        .unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).expect("json parses");

        assert!(config.scheduler.resync_enabled);
        assert_eq!(config.scheduler.resync_interval_seconds, 3600);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/overtrakt.toml"))).unwrap_err();
        assert!(matches!(err, OvertraktError::Config(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("yaml");
        let err = parse_config("", &path).unwrap_err();
        assert!(matches!(err, OvertraktError::Config(msg) if msg.contains("yaml")));
    }
}
