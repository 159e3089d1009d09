//! List sync types
//!
//! Ledger rows, media identifiers and per-row resync outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{impl_str_enum, OvertraktError};

/// Kind of title being synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl_str_enum!(MediaKind {
    Movie => "movie",
    Show => "show",
});

impl MediaKind {
    /// External id type preferred for this kind.
    pub const fn external_id_kind(self) -> IdKind {
        match self {
            Self::Movie => IdKind::Tmdb,
            Self::Show => IdKind::Tvdb,
        }
    }

    /// Plural label used in notification summaries.
    pub const fn summary_label(self) -> &'static str {
        match self {
            Self::Movie => "movie(s)",
            Self::Show => "tv show(s)",
        }
    }
}

/// Identifier namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    Imdb,
    Tmdb,
    Tvdb,
}

impl_str_enum!(IdKind {
    Imdb => "imdb",
    Tmdb => "tmdb",
    Tvdb => "tvdb",
});

/// Collapse placeholder ids to empty.
///
/// Upstream payloads send `0` for "no id". Any value that parses as an integer
/// equal to zero becomes `""`; everything else is returned trimmed.
pub fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(0) => String::new(),
        _ => trimmed.to_string(),
    }
}

/// Normalised identifier pair for one title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaIds {
    pub imdb_id: String,
    /// tmdb id for movies, tvdb id for shows.
    pub external_id: String,
}

impl MediaIds {
    pub fn new(imdb_id: &str, external_id: &str) -> Self {
        Self { imdb_id: normalize_id(imdb_id), external_id: normalize_id(external_id) }
    }

    pub fn is_empty(&self) -> bool {
        self.imdb_id.is_empty() && self.external_id.is_empty()
    }

    /// The single id to submit. External ids win over imdb.
    pub fn preferred(&self, media: MediaKind) -> Option<(IdKind, &str)> {
        if !self.external_id.is_empty() {
            Some((media.external_id_kind(), self.external_id.as_str()))
        } else if !self.imdb_id.is_empty() {
            Some((IdKind::Imdb, self.imdb_id.as_str()))
        } else {
            None
        }
    }
}

/// Ledger row recording one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub imdb_id: String,
    pub request_type: MediaKind,
    pub tmdb_id: String,
    pub tvdb_id: String,
    /// Monotonic: once true it never reverts.
    pub added: bool,
    pub created_at: DateTime<Utc>,
}

impl SyncRequest {
    /// New, not yet confirmed row for the given ids.
    pub fn pending(request_type: MediaKind, ids: &MediaIds, created_at: DateTime<Utc>) -> Self {
        let (tmdb_id, tvdb_id) = match request_type {
            MediaKind::Movie => (ids.external_id.clone(), String::new()),
            MediaKind::Show => (String::new(), ids.external_id.clone()),
        };

        Self {
            imdb_id: ids.imdb_id.clone(),
            request_type,
            tmdb_id,
            tvdb_id,
            added: false,
            created_at,
        }
    }

    /// Identifier pair stored on this row, re-normalised.
    pub fn media_ids(&self) -> MediaIds {
        let external = match self.request_type {
            MediaKind::Movie => &self.tmdb_id,
            MediaKind::Show => &self.tvdb_id,
        };
        MediaIds::new(&self.imdb_id, external)
    }

    /// The id that would be submitted for this row, for log lines.
    pub fn submitted_id(&self) -> Option<(IdKind, String)> {
        let ids = self.media_ids();
        ids.preferred(self.request_type).map(|(kind, id)| (kind, id.to_string()))
    }
}

/// Destination lists for each media kind under one Trakt user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTargets {
    pub user_id: String,
    pub movie_list: String,
    pub show_list: String,
}

impl ListTargets {
    pub fn list_for(&self, media: MediaKind) -> &str {
        match media {
            MediaKind::Movie => &self.movie_list,
            MediaKind::Show => &self.show_list,
        }
    }
}

/// Result of replaying one pending ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub request: SyncRequest,
    pub result: Result<(), OvertraktError>,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// One-line description suitable for logs.
    pub fn describe(&self) -> String {
        let (id_kind, id) = self
            .request
            .submitted_id()
            .map_or_else(|| ("none".to_string(), String::new()), |(kind, id)| (kind.to_string(), id));

        match &self.result {
            Ok(()) => format!(
                "Successfully added {} using {} id {}",
                self.request.request_type, id_kind, id
            ),
            Err(err) => format!(
                "Error adding {} using {} id {}, {}",
                self.request.request_type, id_kind, id, err
            ),
        }
    }
}
