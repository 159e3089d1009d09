//! Reconciliation of a partial-success list response

use overtrakt_domain::{ListItemsResponse, MediaKind};

/// Counts for one media kind extracted from a list items response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub media: MediaKind,
    /// `added + existing`
    pub success: u64,
    /// Number of `not_found` entries.
    pub errors: u64,
    /// Failed identifiers, e.g. `tmdb: 100`.
    pub failed_ids: Vec<String>,
}

impl SyncSummary {
    pub fn from_response(media: MediaKind, response: &ListItemsResponse) -> Self {
        let not_found = response.not_found.items(media);
        let failed_ids = not_found
            .iter()
            .flat_map(|item| item.ids.labelled())
            .map(|(kind, id)| format!("{kind}: {id}"))
            .collect();

        Self {
            media,
            success: response.added.get(media).saturating_add(response.existing.get(media)),
            errors: u64::try_from(not_found.len()).unwrap_or(u64::MAX),
            failed_ids,
        }
    }

    pub fn total(&self) -> u64 {
        self.success.saturating_add(self.errors)
    }

    /// Operator message. Failures take precedence; `None` when the response
    /// reported nothing for this kind.
    pub fn message(&self) -> Option<String> {
        if self.errors > 0 {
            Some(format!(
                "Error adding {}/{} {} to trakt: {}",
                self.errors,
                self.total(),
                self.media.summary_label(),
                self.failed_ids.join(",")
            ))
        } else if self.success > 0 {
            Some(format!(
                "Successfully added {}/{} {} to trakt",
                self.success,
                self.total(),
                self.media.summary_label()
            ))
        } else {
            None
        }
    }
}
