use async_trait::async_trait;
use overtrakt_core::Notifier;
use reqwest::Method;
use serde_json::json;
use tracing::warn;

use crate::http::HttpClient;

/// Posts `{"message": text}` to a single HTTP(S) endpoint.
///
/// Service URLs such as `discord://` or `telegram://` are not understood;
/// point this at a webhook that accepts a JSON `message` field instead.
pub struct WebhookNotifier {
    http: HttpClient,
    url: String,
}

impl WebhookNotifier {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    /// Whether `url` is a plain HTTP(S) endpoint this notifier can post to.
    pub fn supports(url: &str) -> bool {
        let scheme = url.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase());
        matches!(scheme.as_deref(), Some("http" | "https"))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &str) {
        let request = self.http.request(Method::POST, &self.url).json(&json!({ "message": message }));

        match self.http.send(request).await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(url = %self.url, status = %response.status(), "notification rejected");
            }
            Err(err) => warn!(url = %self.url, error = %err, "notification failed"),
        }
    }
}
