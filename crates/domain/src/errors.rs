//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Overtrakt
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum OvertraktError {
    /// Network failure or a non-success HTTP status from a remote service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The device-code window closed before the user authorised the client.
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// Caller supplied input that cannot be acted on.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Sync ledger read or write failure.
    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Work was abandoned because the process is shutting down.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OvertraktError {
    /// Stable label suitable for structured log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::AuthExpired(_) => "auth_expired",
            Self::Auth(_) => "auth",
            Self::Precondition(_) => "precondition",
            Self::Ledger(_) => "ledger",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::Cancelled(_) => "cancelled",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for OvertraktError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for Overtrakt operations
pub type Result<T> = std::result::Result<T, OvertraktError>;
