//! Pixel-level steps around the background matte.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, Rgb, RgbImage, RgbaImage};

use crate::error::MediaResult;

/// Longest side allowed before the matte model runs.
pub const MAX_IMAGE_SIDE: u32 = 2000;

/// JPEG quality of the segmented output.
pub const JPEG_QUALITY: u8 = 95;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Downscale so the longest side is at most `max_side`, keeping aspect ratio.
///
/// Images already within bounds are returned unchanged.
pub fn limit_size(image: RgbaImage, max_side: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= max_side {
        return image;
    }

    let ratio = max_side as f64 / longest as f64;
    let new_w = ((w as f64 * ratio) as u32).max(1);
    let new_h = ((h as f64 * ratio) as u32).max(1);
    imageops::resize(&image, new_w, new_h, FilterType::Lanczos3)
}

/// Alpha-blend onto a white canvas.
pub fn composite_on_white(image: &RgbaImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut out = RgbImage::from_pixel(w, h, WHITE);
    for (x, y, px) in image.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Bounding box `(x, y, width, height)` of pixels that differ from pure white
/// in any channel, or `None` for an all-white image.
pub fn content_bounds(image: &RgbImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, px) in image.enumerate_pixels() {
        if *px != WHITE {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Crop to the non-white bounding box. An all-white image is kept whole.
pub fn crop_to_content(image: &RgbImage) -> RgbImage {
    match content_bounds(image) {
        Some((x, y, w, h)) => imageops::crop_imm(image, x, y, w, h).to_image(),
        None => image.clone(),
    }
}

/// Write `image` as a JPEG file.
pub fn save_jpeg(image: &RgbImage, path: &Path, quality: u8) -> MediaResult<()> {
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = JpegEncoder::new_with_quality(writer, quality);
    encoder.encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)?;
    Ok(())
}
