//! Application state.

use std::sync::Arc;

use ais_media::{build_http_client, MediaResult};
use ais_pipeline::{Pipeline, PipelineConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<Pipeline>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Load the models named by the environment and build the state.
    ///
    /// Blocks while the ONNX sessions are created.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pipeline = Pipeline::load(PipelineConfig::from_env()?)?;
        Ok(Self::with_pipeline(config, pipeline)?)
    }

    /// Build the state around an existing pipeline.
    pub fn with_pipeline(config: ApiConfig, pipeline: Pipeline) -> MediaResult<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let http = build_http_client(pipeline.config().download_timeout)?;

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            http,
        })
    }
}
