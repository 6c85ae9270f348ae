use image::{GrayImage, RgbImage};
use imageproc::rect::Rect;

use crate::geometry::sampling_window;
use crate::image_utils::{draw_outline_mut, window_mean};
use crate::options::{MarkThresholds, ProcessingOptions};
use crate::types::{CellClassification, Choice};

/// The outcome of sampling one bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellScore {
    pub classification: CellClassification,
    /// Mean intensity of the sampled window, 0 (all ink) to 255 (all paper).
    pub statistic: f32,
    pub window: Rect,
}

/// Maps a window mean onto a fill state. The three bands partition `[0, 255]`
/// for any `lo < hi`; `lo` itself counts as crossed and `hi` as blank.
pub fn classify_statistic(statistic: f32, thresholds: &MarkThresholds) -> CellClassification {
    if statistic <= f32::from(thresholds.lo) {
        CellClassification::Crossed
    } else if statistic < f32::from(thresholds.hi) {
        CellClassification::Shaded
    } else {
        CellClassification::Blank
    }
}

/// Samples the bubble centered at `center` in the binary mask, classifies it
/// and outlines the sampled window on `canvas` in the matching color.
///
/// Every cell is drawn whatever its classification so the annotated image can
/// be audited by eye.
pub fn classify_cell(
    binary: &GrayImage,
    canvas: &mut RgbImage,
    center: Choice,
    options: &ProcessingOptions,
) -> CellScore {
    let window = sampling_window(center, options.diameter);
    let statistic = window_mean(binary, &window);
    let classification = classify_statistic(statistic, &options.thresholds);

    draw_outline_mut(
        canvas,
        window,
        options.shape_thickness,
        options.shape_colors.color_for(classification),
    );

    CellScore {
        classification,
        statistic,
        window,
    }
}
