use std::path::{Path, PathBuf};

use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::types::{AnswerLabel, CellClassification};

/// Largest accepted sampling diameter, in pixels.
pub const MAX_DIAMETER: u32 = 1024;
/// Largest accepted outline thickness, in pixels.
pub const MAX_SHAPE_THICKNESS: u32 = 64;

pub const DEFAULT_LABELS: [&str; 7] = ["SA", "A", "SLA", "NAD", "SLD", "D", "SD"];

/// Everything that tunes how a batch is scored. Resolved once, before any
/// image is processed, and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessingOptions {
    /// Side length of the square sampled around each bubble center.
    pub diameter: u32,
    pub extensions: Vec<String>,
    pub thresholds: MarkThresholds,
    pub shape_thickness: u32,
    pub shape_colors: ShapeColors,
    /// The i-th choice of every question maps to the i-th label.
    pub labels: Vec<AnswerLabel>,
    /// Field separator of the coordinates file.
    pub delimiter: char,
    pub multiple_marks: MultipleMarkPolicy,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            diameter: 16,
            extensions: vec!["jpg".to_string(), "png".to_string()],
            thresholds: MarkThresholds::default(),
            shape_thickness: 2,
            shape_colors: ShapeColors::default(),
            labels: DEFAULT_LABELS.iter().map(|&l| AnswerLabel::from(l)).collect(),
            delimiter: ' ',
            multiple_marks: MultipleMarkPolicy::default(),
        }
    }
}

/// Bounds on the mean window intensity. At or below `lo` a bubble is crossed
/// out, strictly between `lo` and `hi` it is shaded, at or above `hi` blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkThresholds {
    pub lo: u8,
    pub hi: u8,
}

impl Default for MarkThresholds {
    fn default() -> Self {
        Self { lo: 69, hi: 135 }
    }
}

/// Outline colors (RGB) drawn around each sampled bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeColors {
    pub blank: [u8; 3],
    pub crossed: [u8; 3],
    pub shaded: [u8; 3],
}

impl Default for ShapeColors {
    fn default() -> Self {
        Self {
            blank: [0, 255, 0],
            crossed: [0, 255, 0],
            shaded: [255, 0, 0],
        }
    }
}

impl ShapeColors {
    pub fn color_for(&self, classification: CellClassification) -> Rgb<u8> {
        match classification {
            CellClassification::Blank => Rgb(self.blank),
            CellClassification::Crossed => Rgb(self.crossed),
            CellClassification::Shaded => Rgb(self.shaded),
        }
    }
}

/// What the per-question breakdown records when more than one choice in a
/// question is shaded. The tally counts every shaded choice either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultipleMarkPolicy {
    /// The last shaded choice in the question is recorded.
    #[default]
    LastWins,
    /// The question is left undetermined.
    Undetermined,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read config file {}: {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),

    #[error("unable to parse config file {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("thresholds must satisfy lo < hi (got lo={lo}, hi={hi})")]
    InvertedThresholds { lo: u8, hi: u8 },

    #[error("sampling diameter must be greater than zero")]
    ZeroDiameter,

    #[error("sampling diameter {} exceeds the maximum of {}", .0, MAX_DIAMETER)]
    DiameterTooLarge(u32),

    #[error("shape thickness {} exceeds the maximum of {}", .0, MAX_SHAPE_THICKNESS)]
    ThicknessTooLarge(u32),

    #[error("at least one answer label is required")]
    NoLabels,

    #[error("at least one image extension is required")]
    NoExtensions,
}

impl ProcessingOptions {
    /// Reads options from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thresholds.lo >= self.thresholds.hi {
            return Err(ConfigError::InvertedThresholds {
                lo: self.thresholds.lo,
                hi: self.thresholds.hi,
            });
        }
        if self.diameter == 0 {
            return Err(ConfigError::ZeroDiameter);
        }
        if self.diameter > MAX_DIAMETER {
            return Err(ConfigError::DiameterTooLarge(self.diameter));
        }
        if self.shape_thickness > MAX_SHAPE_THICKNESS {
            return Err(ConfigError::ThicknessTooLarge(self.shape_thickness));
        }
        if self.labels.is_empty() {
            return Err(ConfigError::NoLabels);
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        Ok(())
    }

    /// Whether `extension` (without the dot) is on the allow-list, ignoring case.
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}
