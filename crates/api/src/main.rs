//! Overtrakt - relays media requests to Trakt lists
//!
//! Main entry point for the `overtrakt` binary.

use std::sync::Arc;

use anyhow::Context;
use overtrakt_api::utils::{init_tracing, LogFormat};
use overtrakt_api::{commands, AppContext, Command};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    init_tracing(LogFormat::from_env());
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => tracing::debug!(error = %err, "no .env file loaded"),
    }

    let command = Command::parse(std::env::args().skip(1))?;
    let config = overtrakt_infra::config::load().context("failed to load configuration")?;

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(AppContext::new(config, shutdown.clone()).context("failed to initialise application")?);

    match command {
        Command::Serve => {
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("shutdown signal received");
                        shutdown.cancel();
                    }
                    Err(err) => error!(error = %err, "unable to listen for shutdown signal"),
                }
            });

            commands::serve(ctx).await?;
        }
        Command::Unsynced => {
            let failed = commands::unsynced(&ctx).await.context("unsynced")?;
            if failed > 0 {
                warn!(failed, "some items are still pending");
            }
        }
    }

    Ok(())
}
