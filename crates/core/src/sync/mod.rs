//! Media list synchronisation

pub mod ports;
pub mod service;
pub mod summary;

pub use ports::{ListItemsApi, SyncLedger};
pub use service::ListSyncEngine;
pub use summary::SyncSummary;
