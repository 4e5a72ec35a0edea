#![deny(unreachable_patterns)]
//! Image processing and model inference for the AIS angle service.
//!
//! This crate provides:
//! - Source photograph download over HTTP
//! - Background segmentation (matte, white composite, content crop, JPEG)
//! - A fixed-size worker pool that segments a directory of images
//! - Angle regression over the segmented images (full-precision or int8 model)
//! - Model file discovery

pub mod batch;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod metrics;
pub mod model_config;
pub mod regression;
pub mod segmentation;
pub mod session;

pub use batch::{run_segmentation, ImageOutcome, SegmentationReport, DEFAULT_SEGMENT_WORKERS};
pub use download::{build_http_client, download_image, validate_image_url, DOWNLOADED_IMAGE_NAME};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{list_images, reset_dir, INITIAL_IMG_DIR, SEGMENTED_IMG_DIR};
pub use model_config::{ModelConfig, ModelPaths, ModelResolutionError, ModelSearchPaths, ModelVariant};
pub use regression::{
    estimate_angles, AngleRegressor, OrtAngleRegressor, QuantParams, RegressionOutcome,
    RegressionSettings,
};
pub use segmentation::{segment_file, BackgroundRemover, OrtBackgroundRemover};
