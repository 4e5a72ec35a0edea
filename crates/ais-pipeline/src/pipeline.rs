//! Segmentation -> regression -> classification.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ais_media::{
    estimate_angles, run_segmentation, AngleRegressor, BackgroundRemover, ModelPaths,
    OrtAngleRegressor, OrtBackgroundRemover, SegmentationReport,
};
use ais_models::{classify_angles, AngleTriple, Classification};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::logging::RunLogger;

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// `None` when segmentation was skipped.
    pub segmentation: Option<SegmentationReport>,
    pub angles: AngleTriple,
    /// Number of segmented images the angles were averaged over.
    pub images: usize,
    pub classification: Classification,
}

/// The angle pipeline with its two model collaborators.
///
/// Cheap to share behind an `Arc`; runs on different base directories may
/// execute concurrently.
pub struct Pipeline {
    remover: Arc<dyn BackgroundRemover>,
    regressor: Arc<dyn AngleRegressor>,
    config: PipelineConfig,
    models: Option<ModelPaths>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("models", &self.models)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        remover: Arc<dyn BackgroundRemover>,
        regressor: Arc<dyn AngleRegressor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            remover,
            regressor,
            config,
            models: None,
        }
    }

    /// Resolve the model files and load them into ONNX Runtime sessions.
    pub fn load(config: PipelineConfig) -> PipelineResult<Self> {
        let paths = config.models.resolve()?;

        let remover = OrtBackgroundRemover::load(&paths.segmentation, config.segment_workers)?;
        let regressor = OrtAngleRegressor::load(&paths.regression, config.regression.clone())?;

        Ok(Self {
            remover: Arc::new(remover),
            regressor: Arc::new(regressor),
            config,
            models: Some(paths),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Model files backing this pipeline, if it was loaded from disk.
    pub fn model_paths(&self) -> Option<&ModelPaths> {
        self.models.as_ref()
    }

    /// Run on `{basepath}/initial_img`, writing `{basepath}/output_frames_seg`.
    ///
    /// Blocking; callers on an async runtime should use `spawn_blocking`.
    pub fn run(&self, basepath: &Path) -> PipelineResult<PipelineOutcome> {
        let logger = RunLogger::new();
        let _span = logger.create_span().entered();
        let start = Instant::now();

        let segmentation = if self.config.skip_segmentation {
            logger.log_progress("segmentation", "skipped, using existing output_frames_seg");
            None
        } else {
            logger.log_start("segmentation", &basepath.display().to_string());
            let report = run_segmentation(self.remover.as_ref(), basepath, self.config.segment_workers)?;
            if report.failed > 0 {
                logger.log_warning(
                    "segmentation",
                    &format!("{} of {} images failed", report.failed, report.total),
                );
            }
            logger.log_completion(
                "segmentation",
                &format!("{} images in {:?}", report.succeeded, report.elapsed),
            );
            Some(report)
        };

        logger.log_start("regression", self.config.variant().as_str());
        let regression = estimate_angles(self.regressor.as_ref(), &self.config.regression, basepath)
            .inspect_err(|e| logger.log_error("regression", &e.to_string()))?;
        logger.log_completion("regression", &regression.angles.to_string());

        let classification = classify_angles(&regression.angles, self.config.threshold);
        logger.log_completion(
            "classification",
            &format!("{} in {:?}", classification.summary(), start.elapsed()),
        );

        Ok(PipelineOutcome {
            segmentation,
            angles: regression.angles,
            images: regression.images,
            classification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use ais_media::{MediaResult, INITIAL_IMG_DIR, SEGMENTED_IMG_DIR};
    use ais_models::CurvatureClass;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    /// Keeps every pixel.
    struct OpaqueRemover;

    impl BackgroundRemover for OpaqueRemover {
        fn remove(&self, image: &RgbaImage) -> MediaResult<RgbaImage> {
            Ok(image.clone())
        }
    }

    struct FixedRegressor([f32; 3]);

    impl AngleRegressor for FixedRegressor {
        fn predict(&self, _image: &RgbImage) -> MediaResult<[f32; 3]> {
            Ok(self.0)
        }
    }

    fn pipeline(prediction: [f32; 3], config: PipelineConfig) -> Pipeline {
        Pipeline::new(Arc::new(OpaqueRemover), Arc::new(FixedRegressor(prediction)), config)
    }

    fn basepath_with(images: usize) -> TempDir {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join(INITIAL_IMG_DIR);
        fs::create_dir_all(&input).unwrap();
        for i in 0..images {
            RgbaImage::from_pixel(12, 12, Rgba([60, 60, 60, 255]))
                .save(input.join(format!("photo_{i}.png")))
                .unwrap();
        }
        dir
    }

    #[test]
    fn test_run_desktop_scaling_and_classification() {
        let dir = basepath_with(3);
        // 0.5 * 40 = 20, 0.5 * 65 = 32.5, 0.0 * 70 = 0
        let outcome = pipeline([0.5, 0.5, 0.0], PipelineConfig::default())
            .run(dir.path())
            .unwrap();

        assert_eq!(outcome.images, 3);
        assert_eq!(outcome.angles, AngleTriple::new(20.0, 32.5, 0.0));
        assert_eq!(outcome.classification.class, CurvatureClass::DoubleThoracic);
        let report = outcome.segmentation.unwrap();
        assert_eq!(report.succeeded, 3);
    }

    #[test]
    fn test_run_respects_threshold() {
        let dir = basepath_with(1);
        let mut config = PipelineConfig::default();
        config.set_variant(ais_media::ModelVariant::Mobile);

        config.threshold = 5.0;
        let outcome = pipeline([2.0, 6.0, 3.0], config.clone()).run(dir.path()).unwrap();
        assert_eq!(outcome.classification.class, CurvatureClass::Thoracic);

        config.threshold = 8.0;
        let outcome = pipeline([2.0, 6.0, 3.0], config).run(dir.path()).unwrap();
        assert_eq!(outcome.classification.class, CurvatureClass::Normal);
    }

    #[test]
    fn test_run_without_images_fails() {
        let dir = basepath_with(0);
        let err = pipeline([0.0; 3], PipelineConfig::default())
            .run(dir.path())
            .unwrap_err();
        assert!(err.is_input_error());
        assert!(matches!(err, PipelineError::Media(ais_media::MediaError::NoImages(_))));
    }

    #[test]
    fn test_skip_segmentation_uses_existing_output() {
        let dir = TempDir::new().unwrap();
        let seg = dir.path().join(SEGMENTED_IMG_DIR);
        fs::create_dir_all(&seg).unwrap();
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])).save(seg.join("a.png")).unwrap();

        let config = PipelineConfig {
            skip_segmentation: true,
            ..PipelineConfig::default()
        };
        let outcome = pipeline([0.0, 0.0, 1.0], config).run(dir.path()).unwrap();

        assert!(outcome.segmentation.is_none());
        assert_eq!(outcome.images, 1);
        assert_eq!(outcome.classification.class, CurvatureClass::Lumbar);
    }

    #[test]
    fn test_load_without_models_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.models.search_paths.directories = vec![dir.path().to_path_buf()];

        let err = Pipeline::load(config).unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)));
    }
}
