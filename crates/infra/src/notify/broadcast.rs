use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use overtrakt_core::Notifier;
use tracing::info;

/// Logs every message and fans it out to all configured channels at once.
///
/// Delivery runs on a detached task: `send` returns as soon as the message is
/// logged, so a slow channel never holds up a webhook response or a
/// device-code poll.
#[derive(Default, Clone)]
pub struct BroadcastNotifier {
    channels: Arc<Vec<Arc<dyn Notifier>>>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: Arc<dyn Notifier>) -> Self {
        Arc::make_mut(&mut self.channels).push(channel);
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn send(&self, message: &str) {
        info!(channels = self.channels.len(), "notify: {}", message.trim_end());
        if self.channels.is_empty() {
            return;
        }

        let channels = Arc::clone(&self.channels);
        let message = message.to_string();
        tokio::spawn(async move {
            join_all(channels.iter().map(|channel| channel.send(&message))).await;
        });
    }
}
