//! Port interfaces for OAuth token management

use async_trait::async_trait;
use overtrakt_domain::{
    AccessTokenResponse, DeviceCodeResponse, DeviceTokenRequest, RefreshTokenRequest, Result,
    StoredCredentials,
};

/// Durable credential storage, one row per OAuth client id.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load credentials for a client. `Ok(None)` means no token yet.
    async fn get(&self, client_id: &str) -> Result<Option<StoredCredentials>>;

    /// Insert or replace the credentials for `credentials.client_id`.
    async fn upsert(&self, credentials: &StoredCredentials) -> Result<()>;
}

/// Classified result of a single device token poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevicePoll {
    /// User has not authorised yet.
    Pending,
    /// Polling too fast; the interval should grow.
    SlowDown,
    /// Token granted. An empty access token is still treated as pending.
    Authorized(AccessTokenResponse),
    /// User rejected the request.
    Denied,
    /// Server reports the device code has expired.
    Expired,
}

/// OAuth endpoints used by the token manager. None of these calls are signed.
#[async_trait]
pub trait DeviceAuthClient: Send + Sync {
    /// Request a new device code and user code.
    async fn request_device_code(&self, client_id: &str) -> Result<DeviceCodeResponse>;

    /// Poll once for a token. Transport and decode failures are errors.
    async fn poll_device_token(&self, request: &DeviceTokenRequest) -> Result<DevicePoll>;

    /// Exchange a refresh token for a new access token.
    async fn refresh_token(&self, request: &RefreshTokenRequest) -> Result<AccessTokenResponse>;
}
