//! Spinal angle regression over the segmented images.
//!
//! Each segmented image is resized (bilinear) to the model's square input,
//! laid out NHWC and fed to the regressor, which predicts three values. The
//! per-image predictions are averaged and, for the desktop model, scaled by
//! the per-angle training range.
//!
//! Int8 models are detected from the session's declared element types: input
//! values are quantized as `round(x / scale) + zero_point` and outputs are
//! dequantized as `(y - zero_point) * scale`.

use std::path::Path;
use std::time::Instant;

use ais_models::AngleTriple;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{list_images, SEGMENTED_IMG_DIR};
use crate::metrics;
use crate::model_config::ModelVariant;
use crate::session::SessionPool;

/// Intra-op threads for the regression session.
const REGRESSION_INTRA_THREADS: usize = 4;

/// Predicts three raw angle values from one image.
pub trait AngleRegressor: Send + Sync {
    fn predict(&self, image: &RgbImage) -> MediaResult<[f32; 3]>;
}

/// Affine int8 quantization parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl Default for QuantParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            zero_point: 0,
        }
    }
}

impl QuantParams {
    pub fn quantize(&self, value: f32) -> i8 {
        let q = (value / self.scale).round() as i32 + self.zero_point;
        q.clamp(i8::MIN as i32, i8::MAX as i32) as i8
    }

    pub fn dequantize(&self, value: i8) -> f32 {
        (value as i32 - self.zero_point) as f32 * self.scale
    }
}

/// Pre- and post-processing parameters of a regression model.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionSettings {
    /// Square input side.
    pub input_size: u32,
    /// Scale pixels to [0, 1].
    pub normalize: bool,
    /// Multiplier applied to the averaged prediction.
    pub output_scale: Option<[f64; 3]>,
    /// Used only when the model input is int8.
    pub input_quant: QuantParams,
    /// Used only when the model output is int8.
    pub output_quant: QuantParams,
}

impl RegressionSettings {
    pub fn for_variant(variant: ModelVariant) -> Self {
        Self {
            input_size: variant.input_size(),
            normalize: variant.normalize_input(),
            output_scale: variant.output_scale(),
            input_quant: QuantParams::default(),
            output_quant: QuantParams::default(),
        }
    }
}

impl Default for RegressionSettings {
    fn default() -> Self {
        Self::for_variant(ModelVariant::default())
    }
}

/// Resize to `size` x `size` and flatten to NHWC floats.
pub(crate) fn preprocess(image: &RgbImage, size: u32, normalize: bool) -> Vec<f32> {
    let resized = imageops::resize(image, size, size, FilterType::Triangle);
    let divisor = if normalize { 255.0 } else { 1.0 };
    resized.as_raw().iter().map(|&v| v as f32 / divisor).collect()
}

/// ONNX Runtime-backed angle regressor.
#[derive(Debug)]
pub struct OrtAngleRegressor {
    pool: SessionPool,
    settings: RegressionSettings,
}

impl OrtAngleRegressor {
    pub fn load(model_path: &Path, settings: RegressionSettings) -> MediaResult<Self> {
        let pool = SessionPool::load(model_path, 1, REGRESSION_INTRA_THREADS)?;
        debug!(
            int8_input = pool.input().is_int8(),
            int8_output = pool.output().is_int8(),
            "Regression model tensor types"
        );
        Ok(Self { pool, settings })
    }

    pub fn settings(&self) -> &RegressionSettings {
        &self.settings
    }

    pub fn model_path(&self) -> &Path {
        self.pool.model_path()
    }

    fn input_tensor(&self, image: &RgbImage) -> MediaResult<Value> {
        let size = self.settings.input_size as usize;
        let shape = vec![1usize, size, size, 3];
        let values = preprocess(image, self.settings.input_size, self.settings.normalize);

        let tensor = if self.pool.input().is_int8() {
            let quant = self.settings.input_quant;
            let data: Vec<i8> = values.iter().map(|&v| quant.quantize(v)).collect();
            Tensor::from_array((shape, data.into_boxed_slice())).map(Value::from)
        } else {
            Tensor::from_array((shape, values.into_boxed_slice())).map(Value::from)
        };
        tensor.map_err(|e| MediaError::invalid_tensor(format!("ORT tensor: {e}")))
    }
}

impl AngleRegressor for OrtAngleRegressor {
    fn predict(&self, image: &RgbImage) -> MediaResult<[f32; 3]> {
        let input = self.input_tensor(image)?;
        let output_name = self.pool.output().name.clone();

        let start = Instant::now();
        let mut session = self.pool.acquire()?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::inference(format!("ORT run failed: {e}")))?;
        metrics::record_inference_duration("regression", start.elapsed().as_secs_f64());

        let output = outputs
            .get(output_name.as_str())
            .ok_or_else(|| MediaError::inference("ORT returned no regression output"))?;
        let values: Vec<f32> = if self.pool.output().is_int8() {
            let quant = self.settings.output_quant;
            let (_, data) = output
                .try_extract_tensor::<i8>()
                .map_err(|e| MediaError::inference(format!("ORT extract: {e}")))?;
            data.iter().map(|&v| quant.dequantize(v)).collect()
        } else {
            let (_, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| MediaError::inference(format!("ORT extract: {e}")))?;
            data.to_vec()
        };

        match values.as_slice() {
            [a, b, c, ..] => Ok([*a, *b, *c]),
            _ => Err(MediaError::invalid_tensor(format!(
                "expected 3 regression outputs, got {}",
                values.len()
            ))),
        }
    }
}

/// Mean angles over a directory of segmented images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionOutcome {
    pub angles: AngleTriple,
    pub images: usize,
}

/// Run the regressor on every image of `{basepath}/output_frames_seg` (sorted
/// by name), average the predictions and apply `settings.output_scale`.
///
/// An empty directory is an error rather than a division by zero.
pub fn estimate_angles(
    regressor: &dyn AngleRegressor,
    settings: &RegressionSettings,
    basepath: &Path,
) -> MediaResult<RegressionOutcome> {
    let dir = basepath.join(SEGMENTED_IMG_DIR);
    let images = list_images(&dir)?;
    if images.is_empty() {
        return Err(MediaError::NoImages(dir));
    }

    let start = Instant::now();
    let mut sum = [0f64; 3];
    for path in &images {
        let image = image::open(path)?.to_rgb8();
        let prediction = regressor.predict(&image)?;
        debug!(image = %path.display(), ?prediction, "Regression prediction");
        for (acc, value) in sum.iter_mut().zip(prediction) {
            *acc += value as f64;
        }
    }

    let count = images.len() as f64;
    let mean = sum.map(|s| s / count);
    let angles = match settings.output_scale {
        Some(scale) => AngleTriple::from(mean).scaled(scale),
        None => AngleTriple::from(mean),
    };

    info!(
        images = images.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Angle 1: {}, Angle 2: {}, Angle 3: {}",
        angles.proximal_thoracic,
        angles.main_thoracic,
        angles.lumbar
    );

    Ok(RegressionOutcome {
        angles,
        images: images.len(),
    })
}
