//! API routes.

use axum::middleware;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{angle, classify, health, ready, root};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Accept both the trailing-slash form and the bare path
    let angle_routes = Router::new()
        .route("/angle/", get(angle))
        .route("/angle", get(angle))
        .route("/classify/", get(classify))
        .route("/classify", get(classify));

    let health_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(angle_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use ais_media::{AngleRegressor, BackgroundRemover, MediaResult};
    use ais_pipeline::{Pipeline, PipelineConfig};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use image::{Rgba, RgbaImage, RgbImage};
    use serde_json::Value;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct OpaqueRemover;

    impl BackgroundRemover for OpaqueRemover {
        fn remove(&self, image: &RgbaImage) -> MediaResult<RgbaImage> {
            Ok(image.clone())
        }
    }

    struct FixedRegressor([f32; 3]);

    impl AngleRegressor for FixedRegressor {
        fn predict(&self, _image: &RgbImage) -> MediaResult<[f32; 3]> {
            Ok(self.0)
        }
    }

    /// Takes longer than the request timeout of the router it is used with.
    struct SlowRegressor(Duration);

    impl AngleRegressor for SlowRegressor {
        fn predict(&self, _image: &RgbImage) -> MediaResult<[f32; 3]> {
            std::thread::sleep(self.0);
            Ok([0.0; 3])
        }
    }

    fn router_with(config: ApiConfig, regressor: Arc<dyn AngleRegressor>) -> Router {
        let pipeline = Pipeline::new(Arc::new(OpaqueRemover), regressor, PipelineConfig::default());
        create_router(AppState::with_pipeline(config, pipeline).unwrap(), None)
    }

    fn test_router(work_dir: &TempDir, prediction: [f32; 3]) -> Router {
        let config = ApiConfig {
            work_dir: work_dir.path().to_path_buf(),
            ..Default::default()
        };
        router_with(config, Arc::new(FixedRegressor(prediction)))
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(16, 16, Rgba([80, 80, 80, 255]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    async fn photo_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/back.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        server
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_root() {
        let work = TempDir::new().unwrap();
        let (status, body) = get_json(test_router(&work, [0.0; 3]), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to the AIS API!");
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let work = TempDir::new().unwrap();
        let (status, body) = get_json(test_router(&work, [0.0; 3]), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = get_json(test_router(&work, [0.0; 3]), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["variant"], "desktop");
    }

    #[tokio::test]
    async fn test_angle_endpoint() {
        let work = TempDir::new().unwrap();
        let server = photo_server().await;
        let uri = format!("/angle/?image_path={}/back.png", server.uri());

        let (status, body) = get_json(test_router(&work, [0.25, 0.5, 0.1]), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["proximal_thoracic"], 10.0);
        assert_eq!(body["main_thoracic"], 32.5);
        assert!((body["lumbar"].as_f64().unwrap() - 7.0).abs() < 1e-4);
        // Per-request directories are removed afterwards
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_classify_endpoint() {
        let work = TempDir::new().unwrap();
        let server = photo_server().await;
        let uri = format!("/classify?image_path={}/back.png", server.uri());

        let (status, body) = get_json(test_router(&work, [0.0, 0.5, 0.5]), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["main_thoracic"], 32.5);
        assert_eq!(body["classification"]["class"], "Double major");
        assert_eq!(body["classification"]["pattern"], "Straight-Bent-Bent");
        assert_eq!(body["images"], 1);
    }

    #[tokio::test]
    async fn test_missing_image_path() {
        let work = TempDir::new().unwrap();
        let (status, body) = get_json(test_router(&work, [0.0; 3]), "/angle/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("image_path"));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let work = TempDir::new().unwrap();
        let (status, _) =
            get_json(test_router(&work, [0.0; 3]), "/angle/?image_path=ftp://host/a.jpg").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let work = TempDir::new().unwrap();
        let server = photo_server().await;
        let uri = format!("/angle/?image_path={}/missing.png", server.uri());

        let (status, body) = get_json(test_router(&work, [0.0; 3]), &uri).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_slow_pipeline_times_out() {
        let work = TempDir::new().unwrap();
        let server = photo_server().await;
        let config = ApiConfig {
            work_dir: work.path().to_path_buf(),
            request_timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let router = router_with(config, Arc::new(SlowRegressor(Duration::from_millis(2500))));
        let uri = format!("/angle/?image_path={}/back.png", server.uri());

        let (status, body) = get_json(router, &uri).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["detail"].as_str().unwrap().contains("timed out"));

        // The abandoned run still owns its directory and removes it when it ends
        let mut remaining = usize::MAX;
        for _ in 0..100 {
            remaining = std::fs::read_dir(work.path()).unwrap().count();
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let work = TempDir::new().unwrap();
        let response = test_router(&work, [0.0; 3])
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }
}
