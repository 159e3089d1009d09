//! Port interfaces for list sync

use async_trait::async_trait;
use overtrakt_domain::{ListItemsRequest, ListItemsResponse, Result, SyncRequest};

/// Durable record of submitted titles, doubling as the resync queue.
#[async_trait]
pub trait SyncLedger: Send + Sync {
    /// Insert or update the row keyed by `(request_type, imdb_id, tmdb_id, tvdb_id)`.
    ///
    /// `added` must never go from true back to false.
    async fn upsert(&self, request: &SyncRequest) -> Result<()>;

    /// All rows with `added = false`, oldest first.
    async fn list_pending(&self) -> Result<Vec<SyncRequest>>;
}

/// Authenticated list-items endpoint.
#[async_trait]
pub trait ListItemsApi: Send + Sync {
    async fn add_list_items(
        &self,
        user_id: &str,
        list_id: &str,
        items: &ListItemsRequest,
    ) -> Result<ListItemsResponse>;
}
