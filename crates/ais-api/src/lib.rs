//! Axum HTTP API for scoliosis angle estimation.
//!
//! This crate provides:
//! - `GET /angle/?image_path=<url>`: the three curvature angles
//! - `GET /classify/?image_path=<url>`: the angles plus the curvature class
//! - Health, readiness and Prometheus metrics endpoints
//! - Request id, logging and security header middleware

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
