//! # Overtrakt Core
//!
//! Business logic for relaying media requests to Trakt lists.
//!
//! This crate contains:
//! - The OAuth token manager (refresh and device-code grants)
//! - The list sync engine and its ledger replay
//! - Port interfaces (traits) implemented by `overtrakt-infra`
//!
//! ## Architecture Principles
//! - Only depends on `overtrakt-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod auth;
pub mod sync;

// Infrastructure ports
pub mod notification_ports;

pub use auth::{
    CredentialStore, DeviceAuthClient, DevicePoll, GrantState, TokenManager, TokenManagerConfig,
};
pub use notification_ports::Notifier;
pub use sync::{ListItemsApi, ListSyncEngine, SyncLedger, SyncSummary};
