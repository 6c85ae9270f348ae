use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image::RgbImage;
use log::{debug, error, info, warn};
use logging_timer::time;
use rayon::prelude::*;

use crate::coords::{load_coordinate_table, CoordsError};
use crate::debug::ImageDebugWriter;
use crate::interpret::{check_labels_cover_table, interpret_page, PageError};
use crate::options::{ConfigError, ProcessingOptions};
use crate::report::{write_page_outputs, ReportError};
use crate::types::CoordinateTable;

/// Errors that stop the whole run before any image is scored.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Input directory: {} does not exist.", .0.display())]
    InputDirNotFound(PathBuf),

    #[error("unable to read input directory {}: {}", .0.display(), .1)]
    ReadInputDir(PathBuf, #[source] std::io::Error),

    #[error("Input directory: {} does not contain any images.", .0.display())]
    NoImages(PathBuf),

    #[error(transparent)]
    Coords(#[from] CoordsError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Labels(#[from] PageError),

    #[error("unable to create output directory {}: {}", .0.display(), .1)]
    CreateOutputDir(PathBuf, #[source] std::io::Error),

    #[error("unable to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors confined to a single image. The rest of the batch carries on.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("unable to decode {0}: {1}")]
    Decode(String, #[source] image::ImageError),

    #[error("{0}: image has no size")]
    EmptyImage(String),

    #[error("{0}: {1}")]
    Page(String, #[source] PageError),

    #[error("{0}: {1}")]
    Write(String, #[source] ReportError),
}

/// Receives coarse progress updates. Implementations must not fail.
pub trait Progress: Sync {
    fn started(&self, _total: usize) {}

    fn image_done(&self, name: &str, completed: usize, total: usize);
}

/// Reports progress through the `log` facade.
pub struct LogProgress;

impl Progress for LogProgress {
    fn started(&self, total: usize) {
        info!("processing {} images", total);
    }

    fn image_done(&self, name: &str, completed: usize, total: usize) {
        info!(
            "[{}/{}] {:.0}% {}",
            completed,
            total,
            completed as f32 / total as f32 * 100.0,
            name
        );
    }
}

/// How the batch is executed, as opposed to how each image is scored.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    /// Worker threads; 0 uses one per available core.
    pub jobs: usize,
    /// Also write intermediate debug images into the output directory.
    pub debug: bool,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failures: Vec<(PathBuf, ScanError)>,
}

/// Lists the images directly inside `dir` whose extension is allowed,
/// skipping dot-files, in directory enumeration order.
pub fn discover_images(
    dir: &Path,
    options: &ProcessingOptions,
) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::InputDirNotFound(dir.to_path_buf()));
    }

    let entries =
        fs::read_dir(dir).map_err(|e| BatchError::ReadInputDir(dir.to_path_buf(), e))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| BatchError::ReadInputDir(dir.to_path_buf(), e))?
            .path();
        if is_candidate_image(&path, options) {
            images.push(path);
        }
    }

    if images.is_empty() {
        return Err(BatchError::NoImages(dir.to_path_buf()));
    }
    Ok(images)
}

fn is_candidate_image(path: &Path, options: &ProcessingOptions) -> bool {
    let is_dot_file = path
        .file_name()
        .map_or(true, |name| name.to_string_lossy().starts_with('.'));
    let allowed = path
        .extension()
        .map_or(false, |ext| options.allows_extension(&ext.to_string_lossy()));

    path.is_file() && !is_dot_file && allowed
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[time]
pub fn load_page_image(path: &Path) -> Result<RgbImage, ScanError> {
    let img = image::open(path)
        .map_err(|e| ScanError::Decode(basename(path), e))?
        .into_rgb8();

    if img.width() == 0 || img.height() == 0 {
        return Err(ScanError::EmptyImage(basename(path)));
    }
    Ok(img)
}

/// Decodes, scores and writes the outputs for one image.
fn process_image(
    path: &Path,
    output_dir: &Path,
    table: &CoordinateTable,
    options: &ProcessingOptions,
    settings: &RunSettings,
) -> Result<(), ScanError> {
    let name = basename(path);
    let img = load_page_image(path)?;

    let debug = if settings.debug {
        ImageDebugWriter::new(output_dir.to_path_buf(), path.to_path_buf())
    } else {
        ImageDebugWriter::disabled()
    };

    let page = interpret_page(img, table, options, &debug)
        .map_err(|e| ScanError::Page(name.clone(), e))?;
    debug!(
        "{}: {} of {} questions answered, {} shaded bubbles",
        name,
        page.breakdown.len(),
        page.question_count(),
        page.tally.total()
    );

    write_page_outputs(output_dir, &name, &page).map_err(|e| ScanError::Write(name, e))
}

/// Scores every form image in `input_dir` against the bubble layout in
/// `coords_file`, writing an annotated image and a text report per image
/// into `output_dir`.
///
/// Problems with the inputs as a whole fail the run before anything is
/// written. Problems with individual images are logged and returned in the
/// summary without affecting the other images.
pub fn run(
    input_dir: &Path,
    output_dir: &Path,
    coords_file: &Path,
    options: &ProcessingOptions,
    settings: &RunSettings,
    progress: &dyn Progress,
) -> Result<BatchSummary, BatchError> {
    options.validate()?;

    let images = discover_images(input_dir, options)?;
    let table = load_coordinate_table(coords_file, options.delimiter)?;
    check_labels_cover_table(&table, &options.labels)?;

    info!("Reading images from the directory: {}", input_dir.display());
    info!("Saving processed files to: {}", output_dir.display());

    fs::create_dir_all(output_dir)
        .map_err(|e| BatchError::CreateOutputDir(output_dir.to_path_buf(), e))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.jobs)
        .build()?;

    let total = images.len();
    let completed = AtomicUsize::new(0);
    progress.started(total);

    let results = pool.install(|| {
        images
            .par_iter()
            .map(|path| {
                let result = process_image(path, output_dir, &table, options, settings);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress.image_done(&basename(path), done, total);
                result
            })
            .collect::<Vec<_>>()
    });

    let mut summary = BatchSummary::default();
    for (path, result) in images.into_iter().zip(results) {
        match result {
            Ok(()) => summary.processed += 1,
            Err(e) => {
                error!("{}", e);
                summary.failures.push((path, e));
            }
        }
    }

    if !summary.failures.is_empty() {
        warn!(
            "{} of {} images could not be processed",
            summary.failures.len(),
            total
        );
    }

    Ok(summary)
}
