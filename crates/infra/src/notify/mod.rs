//! Notification channels
//!
//! Every channel implements [`overtrakt_core::Notifier`]; delivery failures
//! are logged here and never reach the caller.

pub mod broadcast;
pub mod pushover;
pub mod webhook;

pub use broadcast::BroadcastNotifier;
pub use pushover::PushoverNotifier;
pub use webhook::WebhookNotifier;
