//! Shared harness for `overtrakt-infra` integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use overtrakt_core::{CredentialStore, Notifier, TokenManager};
use overtrakt_domain::StoredCredentials;
use overtrakt_infra::database::{DbManager, SqliteCredentialStore, SqliteSyncLedger};
use overtrakt_infra::trakt::{ApiTransport, TraktOAuthClient};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::MockServer;

pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";

/// Temporary migrated database that lives as long as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = DbManager::new(temp_dir.path().join("test.db"), 4)
            .expect("db manager should be created");
        manager.run_migrations().expect("migrations should run");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn credentials(&self) -> Arc<SqliteCredentialStore> {
        Arc::new(SqliteCredentialStore::new(Arc::clone(&self.manager)))
    }

    pub fn ledger(&self) -> Arc<SqliteSyncLedger> {
        Arc::new(SqliteSyncLedger::new(Arc::clone(&self.manager)))
    }

    /// Store a token expiring `expires_in` from now.
    pub async fn seed_token(&self, access: &str, expires_in: Duration) {
        self.credentials()
            .upsert(&StoredCredentials {
                client_id: CLIENT_ID.into(),
                access_token: access.into(),
                refresh_token: format!("{access}-refresh"),
                token_type: "Bearer".into(),
                expires_at: Utc::now() + expires_in,
            })
            .await
            .expect("seed token");
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

pub fn transport(server: &MockServer) -> ApiTransport {
    ApiTransport::new(server.uri(), CLIENT_ID).expect("transport")
}

pub fn token_manager(
    server: &MockServer,
    db: &TestDatabase,
    notifier: Arc<RecordingNotifier>,
) -> Arc<TokenManager> {
    Arc::new(TokenManager::new(
        CLIENT_ID,
        CLIENT_SECRET,
        Arc::new(TraktOAuthClient::new(transport(server))),
        db.credentials(),
        notifier,
    ))
}

pub fn token_body(access: &str) -> Value {
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 7_776_000,
        "refresh_token": format!("{access}-refresh"),
        "scope": "public",
        "created_at": Utc::now().timestamp()
    })
}
