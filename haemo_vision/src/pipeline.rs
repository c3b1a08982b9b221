// THEORY:
// The `pipeline` module is the per-image API of the estimation engine. It wires the
// leaf analysers together in a fixed order:
//
//   decode -> segment -> area (with calibration) -> volume -> timestamp -> record
//
// Its purpose is to give callers one call per photograph and one explicit outcome
// back: either a `VolumeRecord` or a named reason the image was skipped. The
// configuration is validated once, when the pipeline is built, so a degenerate
// reference width stops the run before any file is opened.

use crate::core_modules::area_estimator::{self, AreaEstimate};
use crate::core_modules::calibration::Calibration;
use crate::core_modules::region_mask::{MaskPair, RegionType};
use crate::core_modules::segmentation::Segmenter;
use crate::core_modules::timestamp;
use crate::core_modules::volume::{
    round_to_hundredths, VolumeBreakdown, VolumeConverter, DEFAULT_ABSORBED_ML_PER_CM2,
    DEFAULT_STANDING_DEPTH_CM,
};
use crate::error::{ConfigError, SkipReason};
use chrono::NaiveDateTime;
use image::RgbImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Re-export key data structures for the public API.
pub use crate::core_modules::segmentation::{SegmentationStrategy, SegmentationThresholds};

pub const DEFAULT_KNOWN_WIDTH_CM: f64 = 10.0;

/// Configuration for the VolumePipeline. Every constant the estimate depends on
/// lives here rather than in module state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Physical width, in cm, spanned by each image's horizontal extent.
    pub known_width_cm: f64,
    /// mL of liquid per cm² of absorbed footprint.
    pub absorbed_ml_per_cm2: f64,
    /// Assumed depth, in cm, of standing liquid.
    pub standing_depth_cm: f64,
    pub strategy: SegmentationStrategy,
    pub thresholds: SegmentationThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            known_width_cm: DEFAULT_KNOWN_WIDTH_CM,
            absorbed_ml_per_cm2: DEFAULT_ABSORBED_ML_PER_CM2,
            standing_depth_cm: DEFAULT_STANDING_DEPTH_CM,
            strategy: SegmentationStrategy::default(),
            thresholds: SegmentationThresholds::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Calibration::new(self.known_width_cm)?;
        VolumeConverter::new(self.absorbed_ml_per_cm2, self.standing_depth_cm)?;
        self.thresholds.validate()
    }
}

/// The estimate for one photograph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub image_name: String,
    pub timestamp: Option<NaiveDateTime>,
    pub absorbed_area_cm2: f64,
    pub standing_area_cm2: f64,
    pub absorbed_ml: f64,
    pub standing_ml: f64,
    pub total_ml: f64,
}

impl VolumeRecord {
    pub fn volumes(&self) -> VolumeBreakdown {
        VolumeBreakdown {
            absorbed_ml: self.absorbed_ml,
            standing_ml: self.standing_ml,
            total_ml: self.total_ml,
        }
    }
}

/// What happened to one input image.
#[derive(Debug)]
pub enum ImageOutcome {
    Estimated(VolumeRecord),
    Skipped { image: PathBuf, reason: SkipReason },
}

/// The main, top-level struct for per-image estimation.
pub struct VolumePipeline {
    config: PipelineConfig,
    calibration: Calibration,
    converter: VolumeConverter,
    segmenter: Box<dyn Segmenter + Send + Sync>,
}

impl VolumePipeline {
    /// Validates `config` and builds the pipeline. Fails fast on a degenerate
    /// calibration or coefficient.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let calibration = Calibration::new(config.known_width_cm)?;
        let converter = VolumeConverter::new(config.absorbed_ml_per_cm2, config.standing_depth_cm)?;
        let segmenter = config.strategy.segmenter(&config.thresholds);
        Ok(Self {
            config,
            calibration,
            converter,
            segmenter,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs only the segmentation stage.
    pub fn segment(&self, image: &RgbImage) -> MaskPair {
        self.segmenter.segment(image)
    }

    /// Decodes and estimates the image at `path`. Decode failures become
    /// `ImageOutcome::Skipped`; they never panic or propagate.
    pub fn process_path(&self, path: &Path) -> ImageOutcome {
        match load_image(path) {
            Ok(image) => ImageOutcome::Estimated(self.process_image(path, &image)),
            Err(reason) => {
                warn!("Skipping {}: {}", path.display(), reason);
                ImageOutcome::Skipped {
                    image: path.to_path_buf(),
                    reason,
                }
            }
        }
    }

    /// Estimates an already decoded image. `path` supplies the record name and
    /// the timestamp.
    pub fn process_image(&self, path: &Path, image: &RgbImage) -> VolumeRecord {
        let masks = self.segment(image);
        let areas = area_estimator::estimate(&masks, &self.calibration);
        let record = self.build_record(path, &areas);
        debug!(
            "{}: absorbed {:.2} cm² / {:.2} mL, standing {:.2} cm² / {:.2} mL",
            record.image_name,
            record.absorbed_area_cm2,
            record.absorbed_ml,
            record.standing_area_cm2,
            record.standing_ml
        );
        record
    }

    fn build_record(&self, path: &Path, areas: &AreaEstimate) -> VolumeRecord {
        let volumes = VolumeBreakdown::rounded(
            self.converter.volume(areas.absorbed_cm2, RegionType::Absorbed),
            self.converter.volume(areas.standing_cm2, RegionType::Standing),
        );

        let timestamp = match timestamp::extract(path) {
            Ok(instant) => Some(instant),
            Err(err) => {
                warn!("Could not parse date from filename {}: {}", path.display(), err);
                None
            }
        };

        VolumeRecord {
            image_name: image_name(path),
            timestamp,
            absorbed_area_cm2: round_to_hundredths(areas.absorbed_cm2),
            standing_area_cm2: round_to_hundredths(areas.standing_cm2),
            absorbed_ml: volumes.absorbed_ml,
            standing_ml: volumes.standing_ml,
            total_ml: volumes.total_ml,
        }
    }
}

/// Decodes `path` into 8-bit RGB, dropping any alpha channel.
pub fn load_image(path: &Path) -> Result<RgbImage, SkipReason> {
    let image = image::open(path)?.to_rgb8();
    if image.width() == 0 || image.height() == 0 {
        return Err(SkipReason::Empty);
    }
    Ok(image)
}

fn image_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
