//! Trakt OAuth token lifecycle

pub mod ports;
pub mod token_manager;

pub use ports::{CredentialStore, DeviceAuthClient, DevicePoll};
pub use token_manager::{GrantState, TokenManager, TokenManagerConfig};
