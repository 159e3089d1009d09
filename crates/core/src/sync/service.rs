//! List sync service - adds titles to Trakt lists and replays the ledger

use std::sync::Arc;

use chrono::Utc;
use overtrakt_domain::{
    ItemIds, ListItemsRequest, ListTargets, MediaIds, MediaKind, OvertraktError, Result,
    SyncOutcome, SyncRequest,
};
use tracing::{debug, error, info, instrument, warn};

use super::ports::{ListItemsApi, SyncLedger};
use super::summary::SyncSummary;
use crate::notification_ports::Notifier;

/// Adds titles to Trakt lists and keeps the sync ledger current.
pub struct ListSyncEngine {
    api: Arc<dyn ListItemsApi>,
    ledger: Arc<dyn SyncLedger>,
    notifier: Arc<dyn Notifier>,
}

impl ListSyncEngine {
    pub fn new(
        api: Arc<dyn ListItemsApi>,
        ledger: Arc<dyn SyncLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { api, ledger, notifier }
    }

    /// Add one title to a user list.
    ///
    /// `external_id` is the tmdb id for movies and the tvdb id for shows; it
    /// is submitted in preference to `imdb_id`. Ids equal to zero count as
    /// absent. Titles the remote list could not find are reported through the
    /// notifier only; they do not fail the call.
    ///
    /// # Errors
    /// - `Precondition` when no usable id is supplied
    /// - Authentication, transport and decode errors from the list API
    #[instrument(skip(self))]
    pub async fn add_to_list(
        &self,
        media: MediaKind,
        imdb_id: &str,
        external_id: &str,
        user_id: &str,
        list_id: &str,
    ) -> Result<SyncSummary> {
        let ids = MediaIds::new(imdb_id, external_id);
        let Some((id_kind, id)) = ids.preferred(media) else {
            return Err(OvertraktError::Precondition(format!(
                "unable to add {media} to trakt, no ids are supplied"
            )));
        };

        let mut request = SyncRequest::pending(media, &ids, Utc::now());
        self.record(&request).await;

        debug!(id_kind = %id_kind, id, list_id, "submitting list item");
        let body = ListItemsRequest::single(media, ItemIds::single(id_kind, id));
        let response = self.api.add_list_items(user_id, list_id, &body).await?;

        let summary = SyncSummary::from_response(media, &response);
        if let Some(message) = summary.message() {
            info!(success = summary.success, errors = summary.errors, "{message}");
            self.notifier.send(&message).await;
        } else {
            debug!("list response reported no items for this media kind");
        }

        if summary.success > 0 {
            request.added = true;
            self.record(&request).await;
        }

        Ok(summary)
    }

    /// Replay every ledger row that has not been confirmed yet.
    ///
    /// Each row is attempted once. A failing row is logged and the batch
    /// continues.
    ///
    /// # Errors
    /// Only a failure to read the pending rows aborts the run.
    pub async fn resync_pending(&self, targets: &ListTargets) -> Result<Vec<SyncOutcome>> {
        let pending = self.ledger.list_pending().await?;
        info!(count = pending.len(), "resyncing pending list items");

        let mut outcomes = Vec::with_capacity(pending.len());
        for request in pending {
            let ids = request.media_ids();
            let result = self
                .add_to_list(
                    request.request_type,
                    &ids.imdb_id,
                    &ids.external_id,
                    &targets.user_id,
                    targets.list_for(request.request_type),
                )
                .await
                .map(|_| ());

            let outcome = SyncOutcome { request, result };
            if outcome.is_success() {
                info!("{}", outcome.describe());
            } else {
                warn!("{}", outcome.describe());
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn record(&self, request: &SyncRequest) {
        if let Err(err) = self.ledger.upsert(request).await {
            error!(
                error = %err,
                request_type = %request.request_type,
                added = request.added,
                "failed to record list sync request"
            );
        }
    }
}
