//! Dashboard HTTP server
//!
//! - `GET /api/stats` - totals, per-platform counts and recent downloads (JSON)
//! - `GET /health`    - liveness
//! - `GET /metrics`   - Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::config;
use crate::core::metrics;
use crate::storage::db::DownloadLog;

/// Shared state of the dashboard routes
#[derive(Clone)]
pub struct DashboardState {
    pub log: DownloadLog,
    pub recent_limit: usize,
}

impl DashboardState {
    pub fn new(log: DownloadLog) -> Self {
        Self {
            log,
            recent_limit: config::dashboard::RECENT_LIMIT,
        }
    }
}

/// Builds the dashboard router (also used directly by tests).
pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/api/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serves the dashboard on `0.0.0.0:port` until the process exits.
pub async fn run_dashboard(port: u16, state: DashboardState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Dashboard listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn stats_handler(State(state): State<DashboardState>) -> Response {
    match state.log.stats(state.recent_limit).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            log::error!("Failed to load download stats: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Failed to load stats" })),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn metrics_handler() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
        .into_response()
}
