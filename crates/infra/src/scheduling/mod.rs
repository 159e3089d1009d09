//! Background schedulers
//!
//! - Resync scheduler (periodic replay of unconfirmed ledger rows)
//! - Token refresh scheduler (refresh ahead of expiry)
//!
//! Both share the same lifecycle: `start`/`stop`/`is_running`, a
//! cancellation token per run and a join timeout on stop.

pub mod error;
pub mod resync_scheduler;
pub mod token_refresh_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use resync_scheduler::{ResyncScheduler, ResyncSchedulerConfig};
pub use token_refresh_scheduler::{TokenRefreshScheduler, TokenRefreshSchedulerConfig};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

fn handle_is_running(handle: &TaskHandle) -> bool {
    handle
        .try_lock()
        .ok()
        .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
        .unwrap_or(false)
}

async fn join_with_timeout(handle: &TaskHandle) -> SchedulerResult<()> {
    if let Some(handle) = handle.lock().await.take() {
        tokio::time::timeout(JOIN_TIMEOUT, handle)
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: JOIN_TIMEOUT.as_secs() })?
            .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
    }
    Ok(())
}
