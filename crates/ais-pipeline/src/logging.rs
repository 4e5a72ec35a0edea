//! Structured run logging.
//!
//! Every pipeline run gets an id; stage events carry it so interleaved runs
//! (concurrent API requests) stay separable in the logs.

use tracing::{error, info, warn, Span};

/// Run logger with consistent `run_id` / `stage` fields.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
}

impl RunLogger {
    /// Logger with a fresh random run id.
    pub fn new() -> Self {
        Self::from_string(&uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
        }
    }

    /// Log the start of a stage.
    pub fn log_start(&self, stage: &str, message: &str) {
        info!(run_id = %self.run_id, stage, "Stage started: {}", message);
    }

    pub fn log_progress(&self, stage: &str, message: &str) {
        info!(run_id = %self.run_id, stage, "Stage progress: {}", message);
    }

    pub fn log_warning(&self, stage: &str, message: &str) {
        warn!(run_id = %self.run_id, stage, "Stage warning: {}", message);
    }

    pub fn log_error(&self, stage: &str, message: &str) {
        error!(run_id = %self.run_id, stage, "Stage error: {}", message);
    }

    /// Log the completion of a stage.
    pub fn log_completion(&self, stage: &str, message: &str) {
        info!(run_id = %self.run_id, stage, "Stage completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Span covering the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id)
    }
}

impl Default for RunLogger {
    fn default() -> Self {
        Self::new()
    }
}
