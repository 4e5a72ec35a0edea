//! Scoliosis angle pipeline.
//!
//! This crate provides:
//! - `PipelineConfig` loaded from the environment
//! - `Pipeline`: background segmentation, angle regression and curvature
//!   classification over a base directory
//! - Structured run logging
//! - The `ais` command-line binary

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::RunLogger;
pub use pipeline::{Pipeline, PipelineOutcome};
