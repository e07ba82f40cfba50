//! API routes.

use axum::routing::get;
use axum::routing::post;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{get_scan, get_scan_status, health, submit_scan};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let scan_routes = Router::new()
        .route("/scans", post(submit_scan))
        .route("/scans/:scan_id", get(get_scan))
        .route("/scans/:scan_id/status", get(get_scan_status));

    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api", scan_routes);

    if let Some(handle) = metrics_handle {
        router = router.route(
            "/metrics",
            get(move || crate::metrics::render_metrics(handle.clone())),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
