use async_trait::async_trait;
use overtrakt_core::{DeviceAuthClient, DevicePoll};
use overtrakt_domain::{
    AccessTokenResponse, DeviceCodeRequest, DeviceCodeResponse, DeviceTokenRequest,
    RefreshTokenRequest, Result,
};
use reqwest::StatusCode;
use tracing::debug;

use super::transport::{decode_json, ensure_success, ApiTransport, RequestParameters};

const DEVICE_CODE_PATH: &str = "/oauth/device/code";
const DEVICE_TOKEN_PATH: &str = "/oauth/device/token";
const TOKEN_PATH: &str = "/oauth/token";

/// Unsigned Trakt OAuth endpoints.
#[derive(Clone)]
pub struct TraktOAuthClient {
    transport: ApiTransport,
}

impl TraktOAuthClient {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl DeviceAuthClient for TraktOAuthClient {
    async fn request_device_code(&self, client_id: &str) -> Result<DeviceCodeResponse> {
        let body = serde_json::to_value(DeviceCodeRequest { client_id: client_id.to_string() })?;
        let response = self.transport.execute(RequestParameters::post(DEVICE_CODE_PATH, body), None).await?;
        let response = ensure_success(response, "device code").await?;
        decode_json(response, "device code").await
    }

    async fn poll_device_token(&self, request: &DeviceTokenRequest) -> Result<DevicePoll> {
        let body = serde_json::to_value(request)?;
        let response = self.transport.execute(RequestParameters::post(DEVICE_TOKEN_PATH, body), None).await?;

        let status = response.status();
        let poll = match status {
            status if status.is_success() => {
                DevicePoll::Authorized(decode_json(response, "device token").await?)
            }
            StatusCode::TOO_MANY_REQUESTS => DevicePoll::SlowDown,
            StatusCode::GONE => DevicePoll::Expired,
            StatusCode::IM_A_TEAPOT => DevicePoll::Denied,
            _ => DevicePoll::Pending,
        };
        debug!(%status, "device token poll");
        Ok(poll)
    }

    async fn refresh_token(&self, request: &RefreshTokenRequest) -> Result<AccessTokenResponse> {
        let body = serde_json::to_value(request)?;
        let response = self.transport.execute(RequestParameters::post(TOKEN_PATH, body), None).await?;
        let response = ensure_success(response, "refresh token").await?;
        decode_json(response, "refresh token").await
    }
}
