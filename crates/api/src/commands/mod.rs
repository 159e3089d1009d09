//! Command line entry points: `serve` (default) and `unsynced`

use std::sync::Arc;

use overtrakt_domain::{OvertraktError, Result};
use tracing::{info, warn};

use crate::context::AppContext;
use crate::http;

/// Subcommand selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the webhook listener and background schedulers.
    Serve,
    /// Replay unconfirmed ledger rows once and exit.
    Unsynced,
}

impl Command {
    /// Parse the first argument after the program name.
    ///
    /// # Errors
    /// `Config` for an unknown subcommand.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match args.into_iter().next() {
            None => Ok(Self::Serve),
            Some(arg) => match arg.as_ref() {
                "serve" => Ok(Self::Serve),
                "unsynced" => Ok(Self::Unsynced),
                other => Err(OvertraktError::Config(format!(
                    "unknown command {other:?}, expected `serve` or `unsynced`"
                ))),
            },
        }
    }
}

/// Serve until the shutdown token fires, then stop background work.
///
/// # Errors
/// Scheduler start or HTTP server failures.
pub async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    ctx.start_background().await?;

    let port = ctx.config.server.port;
    let result = http::serve(Arc::clone(&ctx), port, ctx.shutdown_token()).await;

    ctx.shutdown().await;
    result
}

/// Replay every pending ledger row once. Returns the number that failed.
///
/// # Errors
/// Only a failure to read the ledger.
pub async fn unsynced(ctx: &AppContext) -> Result<usize> {
    let outcomes = ctx.engine.resync_pending(&ctx.targets).await?;
    let failed = outcomes.iter().filter(|outcome| !outcome.is_success()).count();

    if failed == 0 {
        info!(processed = outcomes.len(), "unsynced run finished");
    } else {
        warn!(processed = outcomes.len(), failed, "unsynced run finished with failures");
    }
    Ok(failed)
}
