//! sirenscan library interface
//!
//! Scans uploaded zip archives of vehicle metadata for siren IDs reused
//! across content packs. The scanning core lives in [`services`] and has no
//! HTTP dependency; [`build_router`] wraps it in the upload service.

pub mod api;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sirenscan_common::ScanLimits;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Budgets applied to every scan
    pub limits: Arc<ScanLimits>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last internal error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
    /// Uploads scanned to completion
    pub scans_completed: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(limits: ScanLimits) -> Self {
        Self {
            limits: Arc::new(limits),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            scans_completed: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.limits.max_upload_bytes).unwrap_or(usize::MAX);

    Router::new()
        .merge(api::ui_routes())
        .merge(api::scan_routes(body_limit))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
