//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ais_media::{ModelConfig, ModelVariant, QuantParams, RegressionSettings, DEFAULT_SEGMENT_WORKERS};
use ais_models::DEFAULT_CURVE_THRESHOLD;

use crate::error::{PipelineError, PipelineResult};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base directory holding `initial_img/` (CLI runs)
    pub basepath: PathBuf,
    /// Angles at or below this value count as straight
    pub threshold: f64,
    /// Segmentation worker threads (one matte session each)
    pub segment_workers: usize,
    /// Regress directly on `output_frames_seg/` left by an earlier run
    pub skip_segmentation: bool,
    /// Pre- and post-processing of the regression model
    pub regression: RegressionSettings,
    /// Explicit input normalization, kept across variant switches
    pub normalize_override: Option<bool>,
    /// Model variant and file locations
    pub models: ModelConfig,
    /// Timeout for fetching source photographs
    pub download_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            basepath: PathBuf::from("."),
            threshold: DEFAULT_CURVE_THRESHOLD,
            segment_workers: DEFAULT_SEGMENT_WORKERS,
            skip_segmentation: false,
            regression: RegressionSettings::default(),
            normalize_override: None,
            models: ModelConfig::default(),
            download_timeout: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        let models = ModelConfig::from_env()?;
        let mut regression = RegressionSettings::for_variant(models.variant);

        let normalize_override = env_parse::<bool>("AIS_NORMALIZE_INPUT")?;
        if let Some(normalize) = normalize_override {
            regression.normalize = normalize;
        }
        regression.input_quant = quant_from_env("AIS_INPUT_QUANT")?;
        regression.output_quant = quant_from_env("AIS_OUTPUT_QUANT")?;

        let threshold = env_parse("AIS_CURVE_THRESHOLD")?.unwrap_or(DEFAULT_CURVE_THRESHOLD);
        if !threshold.is_finite() {
            return Err(PipelineError::config("AIS_CURVE_THRESHOLD must be a finite number"));
        }

        Ok(Self {
            basepath: std::env::var("AIS_BASEPATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            threshold,
            segment_workers: env_parse("AIS_SEGMENT_WORKERS")?.unwrap_or(DEFAULT_SEGMENT_WORKERS),
            skip_segmentation: false,
            regression,
            normalize_override,
            models,
            download_timeout: Duration::from_secs(
                env_parse("AIS_DOWNLOAD_TIMEOUT_SECS")?.unwrap_or(60),
            ),
        })
    }

    pub fn variant(&self) -> ModelVariant {
        self.models.variant
    }

    /// Switch the regression variant, keeping the quantization parameters and
    /// any explicit normalization choice.
    pub fn set_variant(&mut self, variant: ModelVariant) {
        let defaults = RegressionSettings::for_variant(variant);
        let regression = RegressionSettings {
            normalize: self.normalize_override.unwrap_or(defaults.normalize),
            input_quant: self.regression.input_quant,
            output_quant: self.regression.output_quant,
            ..defaults
        };
        self.models.variant = variant;
        self.regression = regression;
    }
}

/// Parse an optional variable; a present but malformed value is an error.
fn env_parse<T: FromStr>(key: &str) -> PipelineResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PipelineError::config(format!("invalid value for {key}: {raw}"))),
        Err(_) => Ok(None),
    }
}

fn quant_from_env(prefix: &str) -> PipelineResult<QuantParams> {
    let defaults = QuantParams::default();
    let scale = env_parse(&format!("{prefix}_SCALE"))?.unwrap_or(defaults.scale);
    if scale == 0.0 {
        return Err(PipelineError::config(format!("{prefix}_SCALE must be non-zero")));
    }
    Ok(QuantParams {
        scale,
        zero_point: env_parse(&format!("{prefix}_ZERO_POINT"))?.unwrap_or(defaults.zero_point),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.threshold, 5.0);
        assert_eq!(config.segment_workers, 4);
        assert_eq!(config.variant(), ModelVariant::Desktop);
        assert_eq!(config.regression.output_scale, Some([40.0, 65.0, 70.0]));
        assert_eq!(config.download_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_set_variant_keeps_quant() {
        let mut config = PipelineConfig::default();
        config.regression.input_quant = QuantParams {
            scale: 0.5,
            zero_point: -128,
        };

        config.set_variant(ModelVariant::Mobile);

        assert_eq!(config.variant(), ModelVariant::Mobile);
        assert_eq!(config.regression.input_size, 1024);
        assert!(!config.regression.normalize);
        assert_eq!(config.regression.output_scale, None);
        assert_eq!(config.regression.input_quant.zero_point, -128);
    }

    #[test]
    fn test_set_variant_keeps_normalize_override() {
        let mut config = PipelineConfig {
            normalize_override: Some(true),
            ..PipelineConfig::default()
        };
        config.set_variant(ModelVariant::Mobile);
        assert!(config.regression.normalize);

        config.normalize_override = Some(false);
        config.set_variant(ModelVariant::Desktop);
        assert!(!config.regression.normalize);
        assert_eq!(config.regression.output_scale, Some([40.0, 65.0, 70.0]));
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("AIS_TEST_ENV_PARSE_GARBAGE", "four");
        let result = env_parse::<usize>("AIS_TEST_ENV_PARSE_GARBAGE");
        std::env::remove_var("AIS_TEST_ENV_PARSE_GARBAGE");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_env_parse_missing_is_none() {
        let result = env_parse::<usize>("AIS_TEST_ENV_PARSE_UNSET").unwrap();
        assert_eq!(result, None);
    }
}
