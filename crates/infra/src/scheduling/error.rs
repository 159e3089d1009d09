//! Scheduler error types

use overtrakt_domain::OvertraktError;
use thiserror::Error;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Operation timed out
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),

    /// The scheduled job itself failed
    #[error("Job {job} failed: {source}")]
    JobFailed {
        job: &'static str,
        #[source]
        source: OvertraktError,
    },
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let overtrakt_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                OvertraktError::Precondition(err.to_string())
            }
            SchedulerError::JobFailed { source, .. } => source,
            _ => OvertraktError::Internal(err.to_string()),
        };
        Self(overtrakt_err)
    }
}

impl From<SchedulerError> for OvertraktError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
