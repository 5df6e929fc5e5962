//! Health check endpoint
//!
//! Reports liveness, completed scans and the scan budgets in force.

use std::sync::atomic::Ordering;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use sirenscan_common::ScanLimits;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub scans_completed: u64,
    /// Effective limits after config and CLI overrides
    pub limits: ScanLimits,
    /// Most recent 5xx failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    Json(HealthResponse {
        status: "ok",
        module: "sirenscan",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        scans_completed: state.scans_completed.load(Ordering::Relaxed),
        limits: (*state.limits).clone(),
        last_error: state.last_error.read().await.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
