//! SQLite-backed sync ledger.
//!
//! Rows are keyed by `(request_type, imdb_id, tmdb_id, tvdb_id)` and never
//! deleted. The upsert keeps the original `created_at` and only ever raises
//! `added`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use overtrakt_core::SyncLedger;
use overtrakt_domain::{MediaKind, OvertraktError, Result as DomainResult, SyncRequest};
use rusqlite::{params, Connection, Row};
use tokio::task;

use super::manager::{map_join_error, DbManager};

pub struct SqliteSyncLedger {
    db: Arc<DbManager>,
}

impl SqliteSyncLedger {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Every row, pending or not, oldest first.
    #[cfg(test)]
    pub(crate) async fn list_all(&self) -> DomainResult<Vec<SyncRequest>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<SyncRequest>> {
            let conn = db.get_connection().map_err(to_ledger_error)?;
            query_requests(&conn, false)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SyncLedger for SqliteSyncLedger {
    async fn upsert(&self, request: &SyncRequest) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let request = request.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection().map_err(to_ledger_error)?;
            upsert_request(&conn, &request)
                .map_err(|err| OvertraktError::Ledger(format!("upsert failed: {err}")))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_pending(&self) -> DomainResult<Vec<SyncRequest>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<SyncRequest>> {
            let conn = db.get_connection().map_err(to_ledger_error)?;
            query_requests(&conn, true)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn to_ledger_error(err: OvertraktError) -> OvertraktError {
    match err {
        OvertraktError::Ledger(_) => err,
        other => OvertraktError::Ledger(other.to_string()),
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

fn upsert_request(conn: &Connection, request: &SyncRequest) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO trakt_requests
            (request_type, imdb_id, tmdb_id, tvdb_id, added, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(request_type, imdb_id, tmdb_id, tvdb_id) DO UPDATE SET
            added = MAX(trakt_requests.added, excluded.added),
            updated_at = excluded.updated_at",
        params![
            request.request_type.as_str(),
            request.imdb_id,
            request.tmdb_id,
            request.tvdb_id,
            request.added,
            request.created_at.timestamp(),
            Utc::now().timestamp(),
        ],
    )?;
    Ok(())
}

fn query_requests(conn: &Connection, pending_only: bool) -> DomainResult<Vec<SyncRequest>> {
    let sql = if pending_only {
        "SELECT request_type, imdb_id, tmdb_id, tvdb_id, added, created_at
         FROM trakt_requests WHERE added = 0 ORDER BY created_at, rowid"
    } else {
        "SELECT request_type, imdb_id, tmdb_id, tvdb_id, added, created_at
         FROM trakt_requests ORDER BY created_at, rowid"
    };

    let read = |conn: &Connection| -> rusqlite::Result<Vec<(String, String, String, String, bool, i64)>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], read_row)?;
        rows.collect()
    };

    read(conn)
        .map_err(|err| OvertraktError::Ledger(format!("query failed: {err}")))?
        .into_iter()
        .map(|(request_type, imdb_id, tmdb_id, tvdb_id, added, created_at)| {
            Ok(SyncRequest {
                request_type: request_type.parse::<MediaKind>()?,
                imdb_id,
                tmdb_id,
                tvdb_id,
                added,
                created_at: DateTime::<Utc>::from_timestamp(created_at, 0).ok_or_else(|| {
                    OvertraktError::Ledger(format!("created_at out of range: {created_at}"))
                })?,
            })
        })
        .collect()
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, bool, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}
