//! Trakt wire types
//!
//! Request and response bodies for the OAuth device flow and the list items
//! endpoint. Ids in list responses arrive as strings or numbers depending on
//! the id type, so they are decoded leniently into `Option<String>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::sync::{IdKind, MediaKind};

// ============================================================================
// OAuth
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCodeRequest {
    pub client_id: String,
}

/// Response from `POST /oauth/device/code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    /// Seconds until the device code expires.
    pub expires_in: u64,
    /// Seconds to wait between token polls.
    pub interval: u64,
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DeviceTokenRequest {
    pub code: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RefreshTokenRequest {
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: String,
    pub redirect_uri: String,
    pub refresh_token: String,
}

/// Token response shared by the device token and refresh endpoints.
///
/// Every field defaults so that an empty `{}` body decodes to a pending
/// (empty) token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessTokenResponse {
    pub access_token: String,
    /// Unix seconds on the server when the token was issued.
    pub created_at: i64,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
    pub token_type: String,
}

impl AccessTokenResponse {
    /// An empty access token means the user has not authorised yet.
    pub fn is_pending(&self) -> bool {
        self.access_token.is_empty()
    }

    /// Absolute expiry computed from the server's clock.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at.saturating_add(self.expires_in), 0)
    }
}

impl std::fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("pending", &self.is_pending())
            .field("created_at", &self.created_at)
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// List items
// ============================================================================

/// Identifier set for one list item. Only populated ids are serialised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIds {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_id")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_id")]
    pub tmdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_id")]
    pub tvdb: Option<String>,
}

impl ItemIds {
    /// Ids carrying exactly one identifier.
    pub fn single(kind: IdKind, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match kind {
            IdKind::Imdb => Self { imdb: id, ..Self::default() },
            IdKind::Tmdb => Self { tmdb: id, ..Self::default() },
            IdKind::Tvdb => Self { tvdb: id, ..Self::default() },
        }
    }

    /// Populated ids as `(kind, value)` pairs, external ids first.
    pub fn labelled(&self) -> Vec<(IdKind, &str)> {
        [(IdKind::Tmdb, &self.tmdb), (IdKind::Tvdb, &self.tvdb), (IdKind::Imdb, &self.imdb)]
            .into_iter()
            .filter_map(|(kind, id)| id.as_deref().map(|id| (kind, id)))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub ids: ItemIds,
}

/// Body of `POST /users/{user}/lists/{list}/items`, also reused for the
/// `not_found` section of the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItemsRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_empty")]
    pub movies: Vec<ListItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_empty")]
    pub shows: Vec<ListItem>,
}

impl ListItemsRequest {
    /// Request adding a single item of the given kind.
    pub fn single(media: MediaKind, ids: ItemIds) -> Self {
        let item = vec![ListItem { ids }];
        match media {
            MediaKind::Movie => Self { movies: item, ..Self::default() },
            MediaKind::Show => Self { shows: item, ..Self::default() },
        }
    }

    pub fn items(&self, media: MediaKind) -> &[ListItem] {
        match media {
            MediaKind::Movie => &self.movies,
            MediaKind::Show => &self.shows,
        }
    }
}

/// Per-kind counters in the list items response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindCounts {
    pub movies: u64,
    pub shows: u64,
}

impl KindCounts {
    pub fn get(&self, media: MediaKind) -> u64 {
        match media {
            MediaKind::Movie => self.movies,
            MediaKind::Show => self.shows,
        }
    }
}

/// Response of the list items endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListItemsResponse {
    pub added: KindCounts,
    pub existing: KindCounts,
    pub not_found: ListItemsRequest,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) if !id.is_empty() => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ListItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ListItem>>::deserialize(deserializer)?.unwrap_or_default())
}
