//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{get_job, health, ready, upload, RECORD_ROUTE};
use crate::metrics::{metrics_middleware, set_queue_length};
use crate::middleware::{
    cors_layer, hide_internal_errors, request_id, request_logging, security_headers,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let upload_routes = Router::new()
        .route("/upload", post(upload))
        // Multipart reads are capped by the same threshold as the raw body
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size));

    let api_routes = Router::new().route("/jobs/:job_id", get(get_job));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        let executor = Arc::clone(&state.executor);
        Router::new().route(
            "/metrics",
            get(move || async move {
                set_queue_length(executor.queued());
                handle.render()
            }),
        )
    } else {
        Router::new()
    };

    let mut router = Router::new()
        .merge(upload_routes)
        .nest("/api", api_routes)
        .nest_service(RECORD_ROUTE, ServeDir::new(&state.pipeline.record_dir))
        .merge(health_routes)
        .merge(metrics_routes);

    if state.config.is_production() {
        router = router.layer(middleware::from_fn(hide_internal_errors));
    }

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        // Outside request_logging so the completion event carries the id
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
