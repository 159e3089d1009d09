use std::time::Duration;

use overtrakt_domain::constants::{
    HTTP_IDLE_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS, TRAKT_API_KEY_HEADER, TRAKT_API_VERSION,
    TRAKT_API_VERSION_HEADER,
};
use overtrakt_domain::{BearerToken, OvertraktError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::http::HttpClient;

const APPLICATION_JSON: &str = "application/json";

/// One Trakt request. `method` defaults to POST when sent through
/// [`TraktApiClient::query_api`](super::TraktApiClient::query_api).
#[derive(Debug, Clone, Default)]
pub struct RequestParameters {
    pub method: Option<Method>,
    pub path: String,
    pub body: Option<Value>,
}

impl RequestParameters {
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self { method: Some(Method::POST), path: path.into(), body: Some(body) }
    }
}

/// Sends JSON requests to the Trakt API.
///
/// Single attempt only; callers decide whether to retry. The overall request
/// timeout and the idle connection timeout are fixed.
#[derive(Clone)]
pub struct ApiTransport {
    http: HttpClient,
    base_url: String,
    client_id: String,
}

impl ApiTransport {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .pool_idle_timeout(Duration::from_secs(HTTP_IDLE_TIMEOUT_SECS))
            .user_agent(concat!("overtrakt/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        })
    }

    /// Send one request.
    ///
    /// Passing `auth` signs the request with the bearer token, the client id
    /// header and the API version header. Non-2xx responses are returned, not
    /// converted to errors.
    pub async fn execute(
        &self,
        parameters: RequestParameters,
        auth: Option<&BearerToken>,
    ) -> Result<Response> {
        let method = parameters.method.unwrap_or(Method::GET);
        let url = format!("{}{}", self.base_url, parameters.path);

        let mut builder = self
            .http
            .request(method, &url)
            .header(ACCEPT, APPLICATION_JSON)
            .header(CONTENT_TYPE, APPLICATION_JSON);

        if let Some(bearer) = auth {
            builder = builder
                .header(AUTHORIZATION, bearer.header_value())
                .header(TRAKT_API_KEY_HEADER, &self.client_id)
                .header(TRAKT_API_VERSION_HEADER, TRAKT_API_VERSION);
        }

        if let Some(body) = &parameters.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        debug!(path = %parameters.path, signed = auth.is_some(), "trakt request");
        self.http.send(builder).await
    }
}

/// Reject non-2xx responses with a transport error carrying the body.
pub(crate) async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OvertraktError::Transport(format!("{operation}: status {status}: {}", body.trim())))
}

/// Read the body as JSON, mapping failures to decode errors.
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|err| OvertraktError::Transport(format!("{operation}: {err}")))?;
    serde_json::from_slice(&bytes).map_err(|err| OvertraktError::Decode(format!("{operation}: {err}")))
}
