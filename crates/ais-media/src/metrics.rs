//! Processing metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const DOWNLOAD_DURATION_SECONDS: &str = "ais_download_duration_seconds";
    pub const SEGMENTED_IMAGES_TOTAL: &str = "ais_segmented_images_total";
    pub const SEGMENTATION_BATCH_DURATION_SECONDS: &str = "ais_segmentation_batch_duration_seconds";
    pub const INFERENCE_DURATION_SECONDS: &str = "ais_inference_duration_seconds";
}

/// Record download duration.
pub fn record_download_duration(duration_secs: f64) {
    histogram!(names::DOWNLOAD_DURATION_SECONDS).record(duration_secs);
}

/// Record one segmented image.
pub fn record_segmented_image(success: bool) {
    let labels = [("outcome", if success { "success" } else { "failure" }.to_string())];
    counter!(names::SEGMENTED_IMAGES_TOTAL, &labels).increment(1);
}

/// Record segmentation batch duration.
pub fn record_segmentation_batch(duration_secs: f64) {
    histogram!(names::SEGMENTATION_BATCH_DURATION_SECONDS).record(duration_secs);
}

/// Record a single model invocation.
pub fn record_inference_duration(model: &str, duration_secs: f64) {
    let labels = [("model", model.to_string())];
    histogram!(names::INFERENCE_DURATION_SECONDS, &labels).record(duration_secs);
}
