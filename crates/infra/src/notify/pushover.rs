use async_trait::async_trait;
use overtrakt_core::Notifier;
use overtrakt_domain::constants::PUSHOVER_API_URL;
use reqwest::Method;
use tracing::warn;

use crate::http::HttpClient;

/// Sends messages through the Pushover API.
pub struct PushoverNotifier {
    http: HttpClient,
    endpoint: String,
    app_token: String,
    user_key: String,
}

impl PushoverNotifier {
    pub fn new(http: HttpClient, app_token: impl Into<String>, user_key: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: PUSHOVER_API_URL.to_string(),
            app_token: app_token.into(),
            user_key: user_key.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, message: &str) {
        let form = [
            ("token", self.app_token.as_str()),
            ("user", self.user_key.as_str()),
            ("message", message),
        ];
        let request = self.http.request(Method::POST, &self.endpoint).form(&form);

        match self.http.send(request).await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(%status, body = %body.trim(), "pushover rejected message");
            }
            Err(err) => warn!(error = %err, "pushover delivery failed"),
        }
    }
}
