//! Token refresh scheduler.
//!
//! Keeps the access token fresh in the background so webhook requests do not
//! pay for a refresh grant. Only the refresh grant is ever attempted here; an
//! interactive device-code grant is left to the next `authenticate` call.

use std::sync::Arc;
use std::time::Duration;

use overtrakt_core::TokenManager;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{handle_is_running, join_with_timeout, TaskHandle};
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the token refresh scheduler
#[derive(Debug, Clone)]
pub struct TokenRefreshSchedulerConfig {
    /// Time between expiry checks
    pub check_interval: Duration,
    /// Refresh when the token expires within this window
    pub margin: Duration,
}

impl Default for TokenRefreshSchedulerConfig {
    fn default() -> Self {
        Self { check_interval: Duration::from_secs(3600), margin: Duration::from_secs(86_400) }
    }
}

pub struct TokenRefreshScheduler {
    tokens: Arc<TokenManager>,
    config: TokenRefreshSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl TokenRefreshScheduler {
    pub fn new(tokens: Arc<TokenManager>, config: TokenRefreshSchedulerConfig) -> Self {
        Self {
            tokens,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler. The first check runs immediately.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(
            check_interval_secs = self.config.check_interval.as_secs(),
            margin_secs = self.config.margin.as_secs(),
            "Starting token refresh scheduler"
        );

        self.cancellation_token = CancellationToken::new();

        let tokens = Arc::clone(&self.tokens);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::refresh_loop(tokens, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running or the task does not finish
    /// within the join timeout
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();
        join_with_timeout(&self.task_handle).await?;
        info!("Token refresh scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        handle_is_running(&self.task_handle)
    }

    async fn refresh_loop(
        tokens: Arc<TokenManager>,
        config: TokenRefreshSchedulerConfig,
        cancel: CancellationToken,
    ) {
        let margin = chrono::Duration::from_std(config.margin).unwrap_or(chrono::Duration::days(1));
        let mut ticker = tokio::time::interval(config.check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Token refresh loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    match tokens.refresh_if_expiring(margin).await {
                        Ok(true) => info!("Access token refreshed"),
                        Ok(false) => debug!("Access token not due for refresh"),
                        Err(err) => warn!(error = %err, "Proactive token refresh failed"),
                    }
                }
            }
        }
    }
}
