//! Lightweight admin HTTP server
//!
//! Exposes `/healthz` and `/metrics` endpoints, with metrics provided by caller.

use axum::http::StatusCode;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::info;

async fn healthz() -> &'static str { "OK" }

/// Build the admin router; the metrics body comes from `metrics_fn`.
pub fn admin_router(metrics_fn: fn() -> (StatusCode, String)) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(move || async move { metrics_fn() }))
}

/// Serve the admin endpoints on `addr` until the task is dropped.
/// Intended to be spawned next to the long-running sync loop.
pub async fn serve_admin(addr: &str, metrics_fn: fn() -> (StatusCode, String)) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "admin server listening");
    axum::serve(listener, admin_router(metrics_fn)).await?;
    Ok(())
}
