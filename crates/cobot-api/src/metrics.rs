//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "cobot_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "cobot_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "cobot_http_requests_in_flight";

    // Intake metrics
    pub const UPLOADS_ACCEPTED_TOTAL: &str = "cobot_uploads_accepted_total";
    pub const UPLOADS_REJECTED_TOTAL: &str = "cobot_uploads_rejected_total";
    pub const UPLOAD_BYTES: &str = "cobot_upload_bytes";
    pub const QUEUE_LENGTH: &str = "cobot_queue_length";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an upload handed to the pipeline.
pub fn record_upload_accepted(bytes: u64) {
    counter!(names::UPLOADS_ACCEPTED_TOTAL).increment(1);
    histogram!(names::UPLOAD_BYTES).record(bytes as f64);
}

/// Record an upload refused at intake.
pub fn record_upload_rejected(reason: &'static str) {
    counter!(names::UPLOADS_REJECTED_TOTAL, "reason" => reason).increment(1);
}

/// Update queue length gauge.
///
/// Sampled on every scrape so jobs taken off the queue are reflected.
pub fn set_queue_length(length: usize) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

/// Collapse per-resource path segments so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    if path.starts_with("/record/") {
        return "/record/:artifact".to_string();
    }
    if path.starts_with("/api/jobs/") {
        return "/api/jobs/:job_id".to_string();
    }
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/record/20240102T030405/COBOT-20240102T030405-Uab.mp4"),
            "/record/:artifact"
        );
        assert_eq!(
            sanitize_path("/api/jobs/550e8400-e29b-41d4-a716-446655440000"),
            "/api/jobs/:job_id"
        );
        assert_eq!(sanitize_path("/upload"), "/upload");
    }
}
