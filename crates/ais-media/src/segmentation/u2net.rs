//! Salient-object matte model (U^2-Net family) through ONNX Runtime.
//!
//! Input is a 320x320 RGB image scaled by its maximum value and normalized
//! with ImageNet statistics, laid out NCHW. The first output is a saliency map
//! that is min-max normalized and resized back to become the alpha channel.

use std::path::Path;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use ort::value::{Tensor, Value};

use super::BackgroundRemover;
use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::session::SessionPool;

/// Model input resolution.
pub const MATTE_INPUT_SIZE: u32 = 320;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// ONNX Runtime-backed background remover.
#[derive(Debug)]
pub struct OrtBackgroundRemover {
    pool: SessionPool,
}

impl OrtBackgroundRemover {
    /// Load `sessions` copies of the model so that many workers can run at once.
    pub fn load(model_path: &Path, sessions: usize) -> MediaResult<Self> {
        Ok(Self {
            pool: SessionPool::load(model_path, sessions, 1)?,
        })
    }

    pub fn model_path(&self) -> &Path {
        self.pool.model_path()
    }

    fn predict_mask(&self, image: &RgbaImage) -> MediaResult<GrayImage> {
        let input = matte_input_tensor(image)?;
        let output_name = self.pool.output().name.clone();

        let start = Instant::now();
        let mut session = self.pool.acquire()?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::inference(format!("ORT run failed: {e}")))?;
        metrics::record_inference_duration("matte", start.elapsed().as_secs_f64());

        let output = outputs
            .get(output_name.as_str())
            .ok_or_else(|| MediaError::inference("ORT returned no matte output"))?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::inference(format!("ORT extract: {e}")))?;

        let plane = (MATTE_INPUT_SIZE * MATTE_INPUT_SIZE) as usize;
        if data.len() < plane {
            return Err(MediaError::invalid_tensor(format!(
                "Unexpected matte output shape: {:?}",
                shape
            )));
        }

        let mask = saliency_to_mask(&data[..plane], MATTE_INPUT_SIZE, MATTE_INPUT_SIZE);
        let (w, h) = image.dimensions();
        Ok(imageops::resize(&mask, w, h, FilterType::Lanczos3))
    }
}

impl BackgroundRemover for OrtBackgroundRemover {
    fn remove(&self, image: &RgbaImage) -> MediaResult<RgbaImage> {
        let mask = self.predict_mask(image)?;
        Ok(apply_mask(image, &mask))
    }
}

/// Build the (1, 3, 320, 320) input tensor.
fn matte_input_tensor(image: &RgbaImage) -> MediaResult<Value> {
    let chw = normalize_chw(image, MATTE_INPUT_SIZE);
    let size = MATTE_INPUT_SIZE as usize;
    let shape = vec![1usize, 3, size, size];
    Tensor::from_array((shape, chw.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| MediaError::invalid_tensor(format!("ORT tensor: {e}")))
}

/// Resize to `size` x `size`, divide by the image maximum, apply mean/std, HWC -> CHW.
pub(crate) fn normalize_chw(image: &RgbaImage, size: u32) -> Vec<f32> {
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let resized = imageops::resize(&rgb, size, size, FilterType::Lanczos3);

    let max = resized.as_raw().iter().copied().max().unwrap_or(0).max(1) as f32;
    let plane = (size * size) as usize;
    let mut chw = vec![0f32; plane * 3];
    for (i, px) in resized.pixels().enumerate() {
        for c in 0..3 {
            let v = px.0[c] as f32 / max;
            chw[c * plane + i] = (v - MEAN[c]) / STD[c];
        }
    }
    chw
}

/// Min-max normalize a saliency map into an 8-bit mask.
pub(crate) fn saliency_to_mask(values: &[f32], width: u32, height: u32) -> GrayImage {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    GrayImage::from_fn(width, height, |x, y| {
        let v = values[(y * width + x) as usize];
        let n = if range > f32::EPSILON { (v - min) / range } else { 0.0 };
        Luma([(n * 255.0).round().clamp(0.0, 255.0) as u8])
    })
}

/// Multiply the existing alpha by the mask.
pub(crate) fn apply_mask(image: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    let mut out = image.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let m = mask.get_pixel(x, y).0[0] as u32;
        let a = px.0[3] as u32;
        px.0[3] = ((a * m + 127) / 255) as u8;
    }
    out
}
