//! Directory-level segmentation over a fixed-size worker pool.
//!
//! Every image in `{basepath}/initial_img` is segmented independently into
//! `{basepath}/output_frames_seg`. A failed image is logged and counted, and
//! the rest of the batch carries on.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{
    list_images, reset_dir, segmented_output_paths, INITIAL_IMG_DIR, SEGMENTED_IMG_DIR,
};
use crate::metrics;
use crate::segmentation::{segment_file, BackgroundRemover};

/// Worker count of the segmentation pool.
pub const DEFAULT_SEGMENT_WORKERS: usize = 4;

/// Result of segmenting one image.
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub success: bool,
}

/// Summary of a segmentation batch.
#[derive(Debug, Clone, Default)]
pub struct SegmentationReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub outcomes: Vec<ImageOutcome>,
}

impl SegmentationReport {
    fn from_outcomes(outcomes: Vec<ImageOutcome>, elapsed: Duration) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            elapsed,
            outcomes,
        }
    }

    /// Mean wall time per image; zero for an empty batch.
    pub fn average_per_image(&self) -> Duration {
        if self.total == 0 {
            Duration::ZERO
        } else {
            self.elapsed / self.total as u32
        }
    }
}

/// Segment every image of `{basepath}/initial_img` on a pool of `workers` threads.
///
/// The output directory is wiped and recreated first.
pub fn run_segmentation(
    remover: &dyn BackgroundRemover,
    basepath: &Path,
    workers: usize,
) -> MediaResult<SegmentationReport> {
    let input_dir = basepath.join(INITIAL_IMG_DIR);
    let output_dir = basepath.join(SEGMENTED_IMG_DIR);

    let inputs = list_images(&input_dir)?;
    reset_dir(&output_dir)?;

    let outputs = segmented_output_paths(&output_dir, &inputs);
    let pairs: Vec<(PathBuf, PathBuf)> = inputs.into_iter().zip(outputs).collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("ais-segment-{i}"))
        .build()
        .map_err(|e| MediaError::internal(format!("segmentation pool: {e}")))?;

    let start = Instant::now();
    let outcomes: Vec<ImageOutcome> = pool.install(|| {
        pairs
            .par_iter()
            .map(|(input, output)| {
                let success = match segment_file(remover, input, output) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(
                            image = %file_name(input),
                            "Segmentation failed: {}", e
                        );
                        false
                    }
                };
                metrics::record_segmented_image(success);
                ImageOutcome {
                    input: input.clone(),
                    output: output.clone(),
                    success,
                }
            })
            .collect()
    });

    let report = SegmentationReport::from_outcomes(outcomes, start.elapsed());
    metrics::record_segmentation_batch(report.elapsed.as_secs_f64());

    info!(
        images = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        avg_ms = report.average_per_image().as_millis() as u64,
        "Segmentation batch done"
    );

    Ok(report)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_config::ModelVariant;
    use crate::regression::{estimate_angles, AngleRegressor, RegressionSettings};
    use crate::segmentation::testing::{green_photo, FailingRemover, GreenScreenRemover};
    use image::RgbImage;
    use std::fs;
    use tempfile::TempDir;

    struct ConstantRegressor;

    impl AngleRegressor for ConstantRegressor {
        fn predict(&self, _image: &RgbImage) -> MediaResult<[f32; 3]> {
            Ok([1.0, 2.0, 3.0])
        }
    }

    fn setup(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join(INITIAL_IMG_DIR);
        fs::create_dir_all(&input).unwrap();
        for name in names {
            green_photo(32, 32, (4, 4, 8, 16)).save(input.join(name)).unwrap();
        }
        dir
    }

    #[test]
    fn test_segments_all_images() {
        let dir = setup(&["a.png", "b.png", "c.png", "d.png", "e.png"]);

        let report = run_segmentation(&GreenScreenRemover, dir.path(), 4).unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.failed, 0);
        let out = dir.path().join(SEGMENTED_IMG_DIR);
        for stem in ["a", "b", "c", "d", "e"] {
            assert!(out.join(format!("{stem}.jpg")).is_file());
        }
    }

    #[test]
    fn test_same_stem_inputs_keep_separate_outputs() {
        let dir = setup(&["back.png", "back_jpg.png"]);
        let input = dir.path().join(INITIAL_IMG_DIR);
        // PNG content under a .jpg name; decoding sniffs the format
        fs::rename(input.join("back_jpg.png"), input.join("back.jpg")).unwrap();

        let report = run_segmentation(&GreenScreenRemover, dir.path(), 4).unwrap();

        assert_eq!(report.succeeded, 2);
        let out = dir.path().join(SEGMENTED_IMG_DIR);
        assert!(out.join("back.jpg").is_file());
        assert!(out.join("back_png.jpg").is_file());

        let regression = estimate_angles(
            &ConstantRegressor,
            &RegressionSettings::for_variant(ModelVariant::Mobile),
            dir.path(),
        )
        .unwrap();
        assert_eq!(regression.images, report.succeeded);
    }

    #[test]
    fn test_failures_are_isolated() {
        let dir = setup(&["good.png"]);
        fs::write(dir.path().join(INITIAL_IMG_DIR).join("bad.jpg"), b"garbage").unwrap();

        let report = run_segmentation(&GreenScreenRemover, dir.path(), 2).unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let failed: Vec<_> = report.outcomes.iter().filter(|o| !o.success).collect();
        assert!(failed[0].input.ends_with("bad.jpg"));
    }

    #[test]
    fn test_all_failing_is_not_an_error() {
        let dir = setup(&["a.png", "b.png"]);

        let report = run_segmentation(&FailingRemover, dir.path(), 4).unwrap();

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 2);
    }

    #[test]
    fn test_output_dir_is_recreated() {
        let dir = setup(&["a.png"]);
        let out = dir.path().join(SEGMENTED_IMG_DIR);
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.jpg"), b"old").unwrap();

        run_segmentation(&GreenScreenRemover, dir.path(), 1).unwrap();

        assert!(!out.join("stale.jpg").exists());
        assert!(out.join("a.jpg").exists());
    }

    #[test]
    fn test_missing_input_dir() {
        let dir = TempDir::new().unwrap();
        let err = run_segmentation(&GreenScreenRemover, dir.path(), 4).unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[test]
    fn test_empty_batch_average() {
        let report = SegmentationReport::default();
        assert_eq!(report.average_per_image(), Duration::ZERO);
    }
}
