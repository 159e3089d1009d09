//! Database implementations

pub mod credential_repository;
pub mod manager;
pub mod sync_request_repository;

pub use credential_repository::SqliteCredentialStore;
pub use manager::{DbManager, SqliteConnection};
pub use sync_request_repository::SqliteSyncLedger;
