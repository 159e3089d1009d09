//! Resync scheduler for periodic ledger replay.
//!
//! Every `interval` the scheduler replays all rows the list API has not
//! confirmed yet. A run that exceeds `run_timeout` is abandoned and retried on
//! the next tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use overtrakt_core::ListSyncEngine;
use overtrakt_domain::ListTargets;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::{handle_is_running, join_with_timeout, TaskHandle};
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the resync scheduler
#[derive(Debug, Clone)]
pub struct ResyncSchedulerConfig {
    /// Time between runs
    pub interval: Duration,
    /// Upper bound on a single run
    pub run_timeout: Duration,
}

impl Default for ResyncSchedulerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(3600), run_timeout: Duration::from_secs(600) }
    }
}

/// Periodically replays pending list items.
pub struct ResyncScheduler {
    engine: Arc<ListSyncEngine>,
    targets: ListTargets,
    config: ResyncSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl ResyncScheduler {
    pub fn new(engine: Arc<ListSyncEngine>, targets: ListTargets, config: ResyncSchedulerConfig) -> Self {
        Self {
            engine,
            targets,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_secs = self.config.interval.as_secs(), "Starting resync scheduler");

        // New token per run so the scheduler can restart after stop
        self.cancellation_token = CancellationToken::new();

        let engine = Arc::clone(&self.engine);
        let targets = self.targets.clone();
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::resync_loop(engine, targets, config, cancel).await;
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

        info!("Stopping resync scheduler");
        self.cancellation_token.cancel();
        join_with_timeout(&self.task_handle).await?;
        info!("Resync scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        handle_is_running(&self.task_handle)
    }

    /// Run one replay immediately, outside the schedule.
    ///
    /// # Errors
    ///
    /// Returns error when the pending rows cannot be read or the run times out
    pub async fn run_once(&self) -> SchedulerResult<()> {
        Self::run(&self.engine, &self.targets, self.config.run_timeout).await
    }

    async fn resync_loop(
        engine: Arc<ListSyncEngine>,
        targets: ListTargets,
        config: ResyncSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Resync loop cancelled");
                    break;
                }
                () = tokio::time::sleep(config.interval) => {
                    tokio::select! {
                        () = cancel.cancelled() => {
                            debug!("Resync run cancelled");
                            break;
                        }
                        result = Self::run(&engine, &targets, config.run_timeout) => {
                            if let Err(err) = result {
                                error!(error = %err, "Resync run failed");
                            }
                        }
                    }
                }
            }
        }
    }

    async fn run(engine: &ListSyncEngine, targets: &ListTargets, timeout: Duration) -> SchedulerResult<()> {
        let started = Instant::now();

        let outcomes = tokio::time::timeout(timeout, engine.resync_pending(targets))
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: timeout.as_secs() })?
            .map_err(|source| SchedulerError::JobFailed { job: "resync", source })?;

        let failed = outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        if failed > 0 {
            warn!(total = outcomes.len(), failed, "Resync finished with failures");
        } else {
            info!(
                total = outcomes.len(),
                duration_ms = started.elapsed().as_millis(),
                "Resync finished"
            );
        }
        Ok(())
    }
}
