//! Inbound HTTP surface: webhook listener and health probe

pub mod health;
pub mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use overtrakt_domain::{OvertraktError, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::AppContext;

pub use webhook::{WebhookBody, WebhookMedia};

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/webhook", post(webhook::handle))
        .route("/health", get(health::handle))
        .with_state(ctx)
}

/// Serve `router` on `port` until `shutdown` is cancelled.
///
/// # Errors
/// Bind or accept failures.
pub async fn serve(ctx: Arc<AppContext>, port: u16, shutdown: CancellationToken) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| OvertraktError::Internal(format!("unable to start http server on {addr}: {err}")))?;
    info!(%addr, "overtrakt listening");

    axum::serve(listener, router(ctx).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|err| OvertraktError::Internal(format!("http server error: {err}")))
}
