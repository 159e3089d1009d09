//! `GET /health`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;

use crate::context::AppContext;

pub async fn handle(State(ctx): State<Arc<AppContext>>, request: Request) -> (StatusCode, String) {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.to_string());

    let report = ctx.health().await;
    let status = if report.is_healthy() { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };

    (status, report.render(&remote))
}
