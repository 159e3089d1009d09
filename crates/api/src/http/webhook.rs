//! `POST /webhook`: media request notifications from the request manager

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use overtrakt_domain::MediaKind;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::context::AppContext;

/// Webhook payload. Only `media` drives behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    pub media: WebhookMedia,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookMedia {
    #[serde(deserialize_with = "string_or_number")]
    pub imdb_id: String,
    pub media_type: String,
    #[serde(deserialize_with = "string_or_number")]
    pub tmdb_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub tvdb_id: String,
}

impl WebhookMedia {
    /// Media kind and its external id, or `None` for unsupported types.
    pub fn target(&self) -> Option<(MediaKind, &str)> {
        match self.media_type.as_str() {
            "movie" => Some((MediaKind::Movie, self.tmdb_id.as_str())),
            "tv" => Some((MediaKind::Show, self.tvdb_id.as_str())),
            _ => None,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    })
}

/// Decode the payload and add the title to the configured list.
///
/// 201 when the list call went through (partial failures are reported
/// through the notifier), 200 for media types that are not synced, 400 for
/// an unreadable body and 500 when the add failed.
#[instrument(skip_all)]
pub async fn handle(State(ctx): State<Arc<AppContext>>, body: Bytes) -> StatusCode {
    let payload: WebhookBody = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "webhook body rejected");
            ctx.notifier.send(&format!("Error reading webhook body: {err}")).await;
            return StatusCode::BAD_REQUEST;
        }
    };

    let media = &payload.media;
    let Some((kind, external_id)) = media.target() else {
        info!(media_type = %media.media_type, "ignoring webhook for unsupported media type");
        return StatusCode::OK;
    };

    info!(media = %kind, requested_by = %payload.username, "webhook received");
    let list_id = ctx.targets.list_for(kind);
    match ctx
        .engine
        .add_to_list(kind, &media.imdb_id, external_id, &ctx.targets.user_id, list_id)
        .await
    {
        Ok(_) => StatusCode::CREATED,
        Err(err) => {
            error!(error = %err, kind = err.label(), "webhook: unable to add to trakt list");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
