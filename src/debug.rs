use std::path::{Path, PathBuf};

use image::GrayImage;
use log::{debug, warn};

/// Creates a path for a debug image next to the outputs for `base`.
pub fn debug_image_path(output_dir: &Path, base: &Path, label: &str) -> PathBuf {
    output_dir.join(format!(
        "{}_debug_{}.png",
        base.file_stem().unwrap_or_default().to_string_lossy(),
        label
    ))
}

/// Writes intermediate images for one input when debugging is enabled.
/// Failures are logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct ImageDebugWriter {
    target: Option<(PathBuf, PathBuf)>,
}

impl ImageDebugWriter {
    pub fn new(output_dir: PathBuf, input_path: PathBuf) -> Self {
        Self {
            target: Some((output_dir, input_path)),
        }
    }

    pub fn disabled() -> Self {
        Self { target: None }
    }

    pub fn write(&self, label: &str, img: &GrayImage) {
        if let Some((output_dir, input_path)) = &self.target {
            let path = debug_image_path(output_dir, input_path, label);
            match img.save(&path) {
                Ok(()) => debug!("wrote debug image {}", path.display()),
                Err(e) => warn!("unable to write debug image {}: {}", path.display(), e),
            }
        }
    }
}
