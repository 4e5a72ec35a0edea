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
    pub const HTTP_REQUESTS_TOTAL: &str = "ais_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ais_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "ais_http_requests_in_flight";
    pub const PIPELINE_RUNS_TOTAL: &str = "ais_pipeline_runs_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "ais_pipeline_duration_seconds";
}

const KNOWN_PATHS: &[&str] = &[
    "/", "/angle", "/angle/", "/classify", "/classify/", "/health", "/healthz", "/ready", "/metrics",
];

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

/// Record one pipeline run triggered by a request.
pub fn record_pipeline_run(success: bool, duration_secs: f64) {
    let labels = [("outcome", if success { "success" } else { "failure" }.to_string())];
    counter!(names::PIPELINE_RUNS_TOTAL, &labels).increment(1);
    histogram!(names::PIPELINE_DURATION_SECONDS).record(duration_secs);
}

/// Collapse unknown paths into one label so scans cannot blow up cardinality.
fn sanitize_path(path: &str) -> String {
    if !KNOWN_PATHS.contains(&path) {
        return "other".to_string();
    }
    match path.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
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
        assert_eq!(sanitize_path("/angle/"), "/angle");
        assert_eq!(sanitize_path("/angle"), "/angle");
        assert_eq!(sanitize_path("/"), "/");
        assert_eq!(sanitize_path("/wp-admin/setup.php"), "other");
    }
}
