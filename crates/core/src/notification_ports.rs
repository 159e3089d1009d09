//! Port interface for operator notifications

use async_trait::async_trait;

/// Best-effort text broadcast.
///
/// Implementations log their own delivery failures; callers never see them.
/// Production channels detach delivery so `send` returns without waiting on
/// the network.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str);
}
