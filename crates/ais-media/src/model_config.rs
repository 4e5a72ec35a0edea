//! Model variant selection and model file discovery.
//!
//! Two regression model variants exist:
//!
//! | Variant   | Input     | Normalized | Output scale | Default file                  |
//! |-----------|-----------|------------|--------------|-------------------------------|
//! | Desktop   | 256x256   | [0, 1]     | 40 / 65 / 70 | `angle_regressor_fp32.onnx`   |
//! | Mobile    | 1024x1024 | raw 0..255 | none         | `angle_regressor_int8.onnx`   |
//!
//! Resolution order for each model file:
//! 1. Explicit path (`AIS_SEGMENTATION_MODEL` / `AIS_REGRESSION_MODEL`)
//! 2. Default filename in the search directories (`AIS_MODEL_DIR` first)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

/// Default filename of the background matte model.
pub const SEGMENTATION_MODEL_FILE: &str = "u2net.onnx";

/// Regression model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelVariant {
    /// Full-precision model; outputs are fractions of the training range.
    #[default]
    Desktop,
    /// Int8-quantized on-device model; outputs are used raw.
    Mobile,
}

impl ModelVariant {
    /// Square input resolution expected by the model.
    pub const fn input_size(&self) -> u32 {
        match self {
            Self::Desktop => 256,
            Self::Mobile => 1024,
        }
    }

    /// Whether pixels are scaled to [0, 1] before inference.
    pub const fn normalize_input(&self) -> bool {
        matches!(self, Self::Desktop)
    }

    /// Per-angle multiplier applied to the mean prediction.
    pub const fn output_scale(&self) -> Option<[f64; 3]> {
        match self {
            Self::Desktop => Some([40.0, 65.0, 70.0]),
            Self::Mobile => None,
        }
    }

    /// Default regression model filename.
    pub const fn regression_filename(&self) -> &'static str {
        match self {
            Self::Desktop => "angle_regressor_fp32.onnx",
            Self::Mobile => "angle_regressor_int8.onnx",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = ModelResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desktop" | "full" | "fp32" | "keras" => Ok(Self::Desktop),
            "mobile" | "quantized" | "int8" | "tflite" => Ok(Self::Mobile),
            _ => Err(ModelResolutionError::UnknownVariant(s.to_string())),
        }
    }
}

/// Model search directories in priority order.
#[derive(Debug, Clone)]
pub struct ModelSearchPaths {
    pub directories: Vec<PathBuf>,
}

impl Default for ModelSearchPaths {
    fn default() -> Self {
        Self {
            directories: vec![
                // Development: relative path
                PathBuf::from("./models"),
                // Production: container path
                PathBuf::from("/app/models"),
            ],
        }
    }
}

impl ModelSearchPaths {
    /// First existing `dir/filename`.
    pub fn find(&self, filename: &str) -> Option<PathBuf> {
        for dir in &self.directories {
            let path = dir.join(filename);
            if path.is_file() {
                debug!("Found {} at {}", filename, path.display());
                return Some(path);
            }
        }
        None
    }
}

/// Resolved model files.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPaths {
    pub segmentation: PathBuf,
    pub regression: PathBuf,
}

/// Configuration for model loading.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub variant: ModelVariant,
    /// Explicit matte model path.
    pub segmentation_model: Option<PathBuf>,
    /// Explicit regression model path.
    pub regression_model: Option<PathBuf>,
    pub search_paths: ModelSearchPaths,
    /// Minimum model file size to consider valid (corruption check).
    pub min_file_size: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            variant: ModelVariant::default(),
            segmentation_model: None,
            regression_model: None,
            search_paths: ModelSearchPaths::default(),
            min_file_size: 1024,
        }
    }
}

impl ModelConfig {
    /// Create config from environment variables.
    ///
    /// Reads `AIS_MODEL_VARIANT`, `AIS_SEGMENTATION_MODEL`, `AIS_REGRESSION_MODEL`
    /// and `AIS_MODEL_DIR`.
    pub fn from_env() -> Result<Self, ModelResolutionError> {
        let mut config = Self::default();

        if let Ok(variant) = std::env::var("AIS_MODEL_VARIANT") {
            config.variant = variant.parse()?;
        }
        config.segmentation_model = std::env::var("AIS_SEGMENTATION_MODEL").ok().map(PathBuf::from);
        config.regression_model = std::env::var("AIS_REGRESSION_MODEL").ok().map(PathBuf::from);
        if let Ok(dir) = std::env::var("AIS_MODEL_DIR") {
            config.search_paths.directories.insert(0, PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Resolve both model files.
    pub fn resolve(&self) -> Result<ModelPaths, ModelResolutionError> {
        let segmentation = self.resolve_one(self.segmentation_model.as_deref(), SEGMENTATION_MODEL_FILE)?;
        let regression =
            self.resolve_one(self.regression_model.as_deref(), self.variant.regression_filename())?;

        info!(
            variant = %self.variant,
            segmentation = %segmentation.display(),
            regression = %regression.display(),
            "Models resolved"
        );

        Ok(ModelPaths {
            segmentation,
            regression,
        })
    }

    fn resolve_one(&self, explicit: Option<&Path>, filename: &str) -> Result<PathBuf, ModelResolutionError> {
        let path = match explicit {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => return Err(ModelResolutionError::NotFound(path.display().to_string())),
            None => self
                .search_paths
                .find(filename)
                .ok_or_else(|| ModelResolutionError::NotFound(filename.to_string()))?,
        };
        self.validate_model(&path)?;
        Ok(path)
    }

    /// Validate model file has a reasonable size.
    fn validate_model(&self, path: &Path) -> Result<(), ModelResolutionError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| ModelResolutionError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if metadata.len() < self.min_file_size {
            return Err(ModelResolutionError::FileTooSmall {
                path: path.to_path_buf(),
                size: metadata.len(),
                min_size: self.min_file_size,
            });
        }

        Ok(())
    }
}

/// Errors during model resolution.
#[derive(Debug, Error)]
pub enum ModelResolutionError {
    #[error("Unknown model variant '{0}' (expected desktop or mobile)")]
    UnknownVariant(String),

    #[error("Model file {0} not found")]
    NotFound(String),

    #[error("Model at {} appears corrupted ({size} bytes, expected >= {min_size} bytes)", .path.display())]
    FileTooSmall { path: PathBuf, size: u64, min_size: u64 },

    #[error("Failed to read model at {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}
