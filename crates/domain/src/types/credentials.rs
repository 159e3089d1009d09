//! OAuth credential types
//!
//! `Credentials` is the in-memory state owned by the token manager.
//! `StoredCredentials` is the subset written to the credential store; the
//! client secret and the transient device code never leave the process.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::trakt::AccessTokenResponse;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// In-memory OAuth credential state for a single client id.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// Only set while a device-code grant is in flight.
    pub device_code: Option<String>,
}

impl Credentials {
    /// Empty credentials for the given client.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// True when an access token exists and expires strictly after `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.has_access_token() && self.expires_at.is_some_and(|expires_at| expires_at > now)
    }

    /// True when the token is missing or expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) if self.has_access_token() => expires_at <= now + margin,
            _ => true,
        }
    }

    /// Header view of the current token, if any.
    pub fn bearer(&self) -> Option<BearerToken> {
        if !self.has_access_token() {
            return None;
        }
        Some(BearerToken {
            token_type: self.token_type.clone(),
            access_token: self.access_token.clone(),
        })
    }

    /// Load persisted values into this instance. Client secret is untouched.
    pub fn hydrate(&mut self, stored: StoredCredentials) {
        self.access_token = stored.access_token;
        self.refresh_token = stored.refresh_token;
        self.token_type = stored.token_type;
        self.expires_at = Some(stored.expires_at);
    }

    /// Credentials after applying a granted token.
    ///
    /// `expires_at` is derived from the server's `created_at + expires_in`.
    /// A token response without a refresh token keeps the previous one, and a
    /// missing token type falls back to `Bearer`.
    #[must_use]
    pub fn with_token(&self, token: &AccessTokenResponse) -> Self {
        let refresh_token = if token.refresh_token.is_empty() {
            self.refresh_token.clone()
        } else {
            token.refresh_token.clone()
        };

        Self {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            access_token: token.access_token.clone(),
            refresh_token,
            token_type: if token.token_type.is_empty() {
                DEFAULT_TOKEN_TYPE.to_string()
            } else {
                token.token_type.clone()
            },
            expires_at: token.expires_at(),
            device_code: None,
        }
    }

    /// Persistable form. Returns `None` until a token with an expiry exists.
    pub fn to_stored(&self) -> Option<StoredCredentials> {
        let expires_at = self.expires_at?;
        if !self.has_access_token() {
            return None;
        }
        Some(StoredCredentials {
            client_id: self.client_id.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            token_type: self.token_type.clone(),
            expires_at,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("has_access_token", &self.has_access_token())
            .field("has_refresh_token", &self.has_refresh_token())
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("device_code_pending", &self.device_code.is_some())
            .finish_non_exhaustive()
    }
}

/// Credential row as persisted by a credential store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub client_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("client_id", &self.client_id)
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Read-only token view used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    pub token_type: String,
    pub access_token: String,
}

impl BearerToken {
    /// Value for the `Authorization` header: `<token_type> <access_token>`.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken").field("token_type", &self.token_type).finish_non_exhaustive()
    }
}
