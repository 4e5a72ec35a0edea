//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(#[from] ais_media::ModelResolutionError),

    #[error("Media error: {0}")]
    Media(#[from] ais_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True when the run failed because the caller's input was unusable
    /// (no photographs, nothing segmented).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Media(ais_media::MediaError::NoImages(_))
                | PipelineError::Media(ais_media::MediaError::FileNotFound(_))
        )
    }
}
