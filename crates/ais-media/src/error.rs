//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while downloading, segmenting or running inference.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No images found in {0}")]
    NoImages(PathBuf),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid tensor: {0}")]
    InvalidTensor(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create an inference failure error.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    pub fn invalid_tensor(message: impl Into<String>) -> Self {
        Self::InvalidTensor(message.into())
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True when the failure was caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, MediaError::InvalidUrl(_))
    }

    /// True when an upstream HTTP source failed.
    pub fn is_upstream_error(&self) -> bool {
        matches!(self, MediaError::DownloadFailed { .. })
    }
}
