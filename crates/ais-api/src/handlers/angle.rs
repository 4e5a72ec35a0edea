//! Angle estimation handlers.
//!
//! Each request downloads the photograph into its own temporary base
//! directory under the work dir, runs the pipeline off the async executor and
//! removes the directory afterwards.

use std::sync::Arc;
use std::time::Instant;

use ais_media::{download_image, validate_image_url, INITIAL_IMG_DIR};
use ais_models::{AngleTriple, Classification};
use ais_pipeline::PipelineOutcome;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Query parameters of `/angle/` and `/classify/`.
#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    /// URL of the back photograph.
    pub image_path: Option<String>,
}

impl ImageQuery {
    fn url(&self) -> ApiResult<&str> {
        match self.image_path.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(ApiError::bad_request("image_path query parameter is required")),
        }
    }
}

/// `/classify/` response: the angles plus the curvature class.
#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    #[serde(flatten)]
    pub angles: AngleTriple,
    pub classification: Classification,
    pub images: usize,
}

/// Estimate the three curvature angles of the photograph at `image_path`.
pub async fn angle(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> ApiResult<Json<AngleTriple>> {
    let outcome = process(&state, query.url()?).await?;
    Ok(Json(outcome.angles))
}

/// Estimate the angles and classify the curvature pattern.
pub async fn classify(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> ApiResult<Json<ClassifyResponse>> {
    let outcome = process(&state, query.url()?).await?;
    Ok(Json(ClassifyResponse {
        angles: outcome.angles,
        classification: outcome.classification,
        images: outcome.images,
    }))
}

async fn process(state: &AppState, url: &str) -> ApiResult<PipelineOutcome> {
    let url = validate_image_url(url)?;

    let work = tempfile::Builder::new()
        .prefix("ais-")
        .tempdir_in(&state.config.work_dir)
        .map_err(|e| ApiError::internal(format!("work dir: {e}")))?;

    let pipeline = Arc::clone(&state.pipeline);
    let http = state.http.clone();
    let run = async move {
        download_image(&http, url.as_str(), &work.path().join(INITIAL_IMG_DIR)).await?;

        // The directory moves into the blocking task so it outlives a timed-out request.
        let task = tokio::task::spawn_blocking(move || {
            let outcome = pipeline.run(work.path());
            drop(work);
            outcome
        });
        let outcome = task
            .await
            .map_err(|e| ApiError::internal(format!("pipeline task: {e}")))??;
        Ok::<_, ApiError>(outcome)
    };

    let start = Instant::now();
    let result = tokio::time::timeout(state.config.request_timeout, run)
        .await
        .map_err(|_| ApiError::Timeout)
        .and_then(|r| r);
    metrics::record_pipeline_run(result.is_ok(), start.elapsed().as_secs_f64());

    let outcome = result?;
    info!(
        images = outcome.images,
        class = %outcome.classification.class,
        "Angles: {}",
        outcome.angles
    );
    Ok(outcome)
}
