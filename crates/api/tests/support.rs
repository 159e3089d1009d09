//! Shared harness for `overtrakt-api` integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use overtrakt_api::AppContext;
use overtrakt_core::CredentialStore;
use overtrakt_domain::{
    Config, DatabaseConfig, NotificationConfig, SchedulerConfig, ServerConfig, StoredCredentials,
    TraktConfig,
};
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

pub const CLIENT_ID: &str = "client-id";
pub const NOTIFY_PATH: &str = "/notify";

/// Application context wired against a mock Trakt server and a temp database.
pub struct TestApp {
    pub ctx: Arc<AppContext>,
    pub server: MockServer,
    _temp_dir: TempDir,
}

pub fn test_config(server: &MockServer, temp_dir: &TempDir) -> Config {
    Config {
        database: DatabaseConfig {
            path: temp_dir.path().join("overtrakt.db").to_string_lossy().into_owned(),
            pool_size: 2,
        },
        trakt: TraktConfig {
            client_id: CLIENT_ID.into(),
            client_secret: "client-secret".into(),
            user: "me".into(),
            movie_list: "movies".into(),
            show_list: "shows".into(),
            api_url: server.uri(),
        },
        server: ServerConfig::default(),
        notifications: NotificationConfig {
            urls: vec![format!("{}{NOTIFY_PATH}", server.uri())],
            ..NotificationConfig::default()
        },
        scheduler: SchedulerConfig::default(),
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|config| config).await
    }

    pub async fn with_config(adjust: impl FnOnce(Config) -> Config) -> Self {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let config = adjust(test_config(&server, &temp_dir));
        let ctx = AppContext::new(config, CancellationToken::new()).expect("context should build");

        Self { ctx: Arc::new(ctx), server, _temp_dir: temp_dir }
    }

    /// Store a long-lived token so no OAuth traffic is needed.
    pub async fn seed_token(&self, access: &str) {
        self.ctx
            .credentials
            .upsert(&StoredCredentials {
                client_id: CLIENT_ID.into(),
                access_token: access.into(),
                refresh_token: format!("{access}-refresh"),
                token_type: "Bearer".into(),
                expires_at: Utc::now() + Duration::days(30),
            })
            .await
            .expect("seed token");
    }

    /// Messages delivered to the notification URL.
    pub async fn notifications(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == NOTIFY_PATH)
            .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
            .filter_map(|body| body["message"].as_str().map(str::to_string))
            .collect()
    }

    /// Wait until at least `count` notifications arrived; delivery is detached
    /// from the sender.
    pub async fn wait_for_notifications(&self, count: usize) -> Vec<String> {
        for _ in 0..100 {
            let messages = self.notifications().await;
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        self.notifications().await
    }

    /// Requests that reached the Trakt API paths.
    pub async fn trakt_requests(&self) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() != NOTIFY_PATH)
            .collect()
    }
}
