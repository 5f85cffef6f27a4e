//! Health Routes
//!
//! Health check endpoints for monitoring and probes.
//!
//! - GET /hello - Fixed greeting
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /hello
pub async fn hello() -> &'static str {
    "hello world"
}

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Full health status with dataset count.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let datasets = state.datasets.len();
    let status = if datasets > 0 { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        datasets,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
