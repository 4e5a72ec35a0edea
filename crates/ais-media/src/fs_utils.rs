//! Filesystem helpers for the base directory layout.
//!
//! A run works inside `{basepath}`:
//! - `initial_img/` holds the input photographs
//! - `output_frames_seg/` holds the segmented images, recreated on every run

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Input subdirectory.
pub const INITIAL_IMG_DIR: &str = "initial_img";

/// Segmented output subdirectory.
pub const SEGMENTED_IMG_DIR: &str = "output_frames_seg";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Check the extension against jpg/jpeg/png, case-insensitively.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// List supported images directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> MediaResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MediaError::FileNotFound(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Delete `dir` with all its contents (if present) and create it empty.
pub fn reset_dir(dir: &Path) -> MediaResult<()> {
    if dir.exists() {
        tracing::debug!("Removing previous contents of {}", dir.display());
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Output path for a segmented image: same stem, `.jpg` extension.
pub fn segmented_output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    output_dir.join(format!("{stem}.jpg"))
}

/// Output paths for a batch, one per input and all distinct.
///
/// Inputs keep `<stem>.jpg` unless an earlier input already claimed it
/// (`back.png` next to `back.jpg`); those fall back to `<stem>_<ext>.jpg`,
/// then to a numeric suffix. Names are compared case-insensitively.
pub fn segmented_output_paths(output_dir: &Path, inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let preferred = segmented_output_path(output_dir, input);
            let stem = preferred
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let ext = input
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();

            std::iter::once(format!("{stem}.jpg"))
                .chain(std::iter::once(format!("{stem}_{ext}.jpg")))
                .chain((1..).map(|n| format!("{stem}_{ext}_{n}.jpg")))
                .find(|name| taken.insert(name.to_lowercase()))
                .map(|name| output_dir.join(name))
                .unwrap_or(preferred)
        })
        .collect()
}
