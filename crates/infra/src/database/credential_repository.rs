//! SQLite-backed credential store.
//!
//! One row per OAuth client id. All database operations run in
//! `spawn_blocking` to avoid blocking the async runtime.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use overtrakt_core::CredentialStore;
use overtrakt_domain::{OvertraktError, Result as DomainResult, StoredCredentials};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;

use super::manager::{map_join_error, map_sql_error, DbManager};

pub struct SqliteCredentialStore {
    db: Arc<DbManager>,
}

impl SqliteCredentialStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get(&self, client_id: &str) -> DomainResult<Option<StoredCredentials>> {
        let db = Arc::clone(&self.db);
        let client_id = client_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<StoredCredentials>> {
            let conn = db.get_connection()?;
            query_credentials(&conn, &client_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert(&self, credentials: &StoredCredentials) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let credentials = credentials.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_credentials(&conn, &credentials).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

fn query_credentials(conn: &Connection, client_id: &str) -> DomainResult<Option<StoredCredentials>> {
    let row = conn
        .query_row(
            "SELECT client_id, access_token, refresh_token, token_type, expires_at
             FROM trakt_credentials
             WHERE client_id = ?1",
            params![client_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()
        .map_err(map_sql_error)?;

    row.map(|(client_id, access_token, refresh_token, token_type, expires_at)| {
        let expires_at = DateTime::<Utc>::from_timestamp(expires_at, 0).ok_or_else(|| {
            OvertraktError::Database(format!("stored expiry out of range: {expires_at}"))
        })?;
        Ok(StoredCredentials { client_id, access_token, refresh_token, token_type, expires_at })
    })
    .transpose()
}

fn upsert_credentials(conn: &Connection, credentials: &StoredCredentials) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO trakt_credentials
            (client_id, access_token, refresh_token, token_type, expires_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(client_id) DO UPDATE SET
            access_token = excluded.access_token,
            refresh_token = excluded.refresh_token,
            token_type = excluded.token_type,
            expires_at = excluded.expires_at,
            updated_at = excluded.updated_at",
        params![
            credentials.client_id,
            credentials.access_token,
            credentials.refresh_token,
            credentials.token_type,
            credentials.expires_at.timestamp(),
            Utc::now().timestamp(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    async fn setup() -> (SqliteCredentialStore, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let db = DbManager::new(dir.path().join("creds.db"), 2).expect("manager");
        db.run_migrations().expect("migrations");
        (SqliteCredentialStore::new(Arc::new(db)), dir)
    }

    fn sample(access: &str) -> StoredCredentials {
        StoredCredentials {
            client_id: "client".into(),
            access_token: access.into(),
            refresh_token: "refresh".into(),
            token_type: "bearer".into(),
            expires_at: Utc.with_ymd_and_hms(2031, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_client_is_none() {
        let (store, _dir) = setup().await;

        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_then_get_round_trips() {
        let (store, _dir) = setup().await;

        store.upsert(&sample("first")).await.unwrap();

        assert_eq!(store.get("client").await.unwrap(), Some(sample("first")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_replaces_existing_row() {
        let (store, _dir) = setup().await;

        store.upsert(&sample("first")).await.unwrap();
        store.upsert(&sample("second")).await.unwrap();

        let loaded = store.get("client").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "second");
    }
}
