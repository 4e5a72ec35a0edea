//! Background segmentation of a single photograph.
//!
//! The matte model itself is an external collaborator behind
//! [`BackgroundRemover`]; this module owns the surrounding steps: downscale
//! oversized inputs, composite on white, crop to content and encode JPEG.

pub mod compose;
pub mod u2net;

use std::path::Path;

use image::RgbaImage;

use crate::error::MediaResult;

pub use compose::{
    composite_on_white, content_bounds, crop_to_content, limit_size, save_jpeg, JPEG_QUALITY,
    MAX_IMAGE_SIDE,
};
pub use u2net::OrtBackgroundRemover;

/// Removes the background of an image by producing an alpha matte.
///
/// Implementations return an image of the same size whose alpha channel is
/// zero on background pixels.
pub trait BackgroundRemover: Send + Sync {
    fn remove(&self, image: &RgbaImage) -> MediaResult<RgbaImage>;
}

/// Segment `input` and write the cropped, white-backed JPEG to `output`.
pub fn segment_file(remover: &dyn BackgroundRemover, input: &Path, output: &Path) -> MediaResult<()> {
    // Downloads are stored as .jpg whatever their content.
    let image = image::io::Reader::open(input)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    let image = limit_size(image, MAX_IMAGE_SIDE);

    let matted = remover.remove(&image)?;
    let on_white = composite_on_white(&matted);
    let cropped = crop_to_content(&on_white);

    save_jpeg(&cropped, output, JPEG_QUALITY)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::MediaError;
    use image::Rgba;

    /// Treats pure green as background.
    pub struct GreenScreenRemover;

    impl BackgroundRemover for GreenScreenRemover {
        fn remove(&self, image: &RgbaImage) -> MediaResult<RgbaImage> {
            let mut out = image.clone();
            for px in out.pixels_mut() {
                if px.0[..3] == [0, 255, 0] {
                    *px = Rgba([0, 255, 0, 0]);
                }
            }
            Ok(out)
        }
    }

    /// Always fails.
    pub struct FailingRemover;

    impl BackgroundRemover for FailingRemover {
        fn remove(&self, _image: &RgbaImage) -> MediaResult<RgbaImage> {
            Err(MediaError::inference("matte model unavailable"))
        }
    }

    /// Green canvas with a dark rectangle at (x, y, w, h).
    pub fn green_photo(width: u32, height: u32, subject: (u32, u32, u32, u32)) -> RgbaImage {
        let (sx, sy, sw, sh) = subject;
        RgbaImage::from_fn(width, height, |x, y| {
            if x >= sx && x < sx + sw && y >= sy && y < sy + sh {
                Rgba([40, 40, 40, 255])
            } else {
                Rgba([0, 255, 0, 255])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_segment_file_crops_to_subject() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("back.png");
        let output = dir.path().join("back.jpg");
        green_photo(64, 48, (10, 5, 20, 30)).save(&input).unwrap();

        segment_file(&GreenScreenRemover, &input, &output).unwrap();

        let result = image::open(&output).unwrap();
        assert_eq!((result.width(), result.height()), (20, 30));
    }

    #[test]
    fn test_segment_file_sniffs_content() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("source.png");
        green_photo(16, 16, (2, 2, 4, 6)).save(&png).unwrap();
        let input = dir.path().join("downloaded_image.jpg");
        std::fs::rename(&png, &input).unwrap();
        let output = dir.path().join("out.jpg");

        segment_file(&GreenScreenRemover, &input, &output).unwrap();

        let result = image::open(&output).unwrap();
        assert_eq!((result.width(), result.height()), (4, 6));
    }

    #[test]
    fn test_segment_file_propagates_matte_errors() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("back.png");
        green_photo(8, 8, (1, 1, 2, 2)).save(&input).unwrap();

        let result = segment_file(&FailingRemover, &input, &dir.path().join("out.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn test_segment_file_rejects_non_images() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.jpg");
        std::fs::write(&input, b"not an image").unwrap();

        let result = segment_file(&GreenScreenRemover, &input, &dir.path().join("out.jpg"));
        assert!(result.is_err());
    }
}
