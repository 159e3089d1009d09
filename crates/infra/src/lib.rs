//! # Overtrakt Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite persistence (credential store, sync ledger)
//! - HTTP client and Trakt API adapters
//! - Notification channels (webhook URLs, Pushover)
//! - Configuration loading and background schedulers
//!
//! ## Architecture
//! - Implements traits defined in `overtrakt-core`
//! - Contains all "impure" code (I/O, network, filesystem)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod notify;
pub mod scheduling;
pub mod trakt;

// Re-export commonly used items
pub use database::{DbManager, SqliteCredentialStore, SqliteSyncLedger};
pub use errors::InfraError;
pub use http::HttpClient;
pub use notify::{BroadcastNotifier, PushoverNotifier, WebhookNotifier};
pub use trakt::{ApiTransport, RequestParameters, TraktApiClient, TraktOAuthClient};
