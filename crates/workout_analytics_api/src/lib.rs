//! HTTP service exposing workout analytics and report history.
//!
//! The router is built from an [`AppState`] holding the upstream row source
//! and the report store, so tests can swap either for an in-process fake.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::timeout::TimeoutLayer;
use workout_analytics::RowSource;
use workout_analytics::store::ReportStore;

pub mod error;
pub mod handlers;

pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub struct AppState {
    pub rows: Arc<dyn RowSource>,
    pub store: Arc<dyn ReportStore>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(rows: Arc<dyn RowSource>, store: Arc<dyn ReportStore>) -> Self {
        Self {
            rows,
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/analytics/summary", get(handlers::summary))
        .route("/analytics/rebuild/latest", post(handlers::rebuild_latest))
        .route(
            "/analytics/reports",
            post(handlers::create_report).get(handlers::list_reports),
        )
        .route(
            "/analytics/reports/{id}",
            get(handlers::get_report).delete(handlers::delete_report),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
