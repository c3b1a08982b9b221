// THEORY:
// Every failure the engine can produce is named here. The split mirrors how far a
// failure is allowed to travel:
// - `ConfigError` is fatal and surfaces before any image is opened.
// - `SkipReason` and `TimestampError` are per-image and are recovered locally by
//   the pipeline: the former drops the image, the latter only drops its timestamp.
// - `SummaryError` belongs to the persistence layer around the core.

use std::path::PathBuf;
use thiserror::Error;

/// A configuration that cannot produce meaningful estimates.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("known width must be a positive number of centimetres, got {0}")]
    NonPositiveWidth(f64),
    #[error("coefficient `{name}` must be finite and non-negative, got {value}")]
    InvalidCoefficient { name: &'static str, value: f64 },
    #[error("percentile `{name}` must lie within 0..=100, got {value}")]
    InvalidPercentile { name: &'static str, value: f64 },
    #[error("blur radius must be at most 15 pixels, got {0}")]
    InvalidBlurRadius(u32),
}

/// Why an image produced no record.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("image could not be decoded: {0}")]
    Unreadable(#[from] image::ImageError),
    #[error("image has no pixels")]
    Empty,
    #[error("worker failed while processing the image: {0}")]
    Worker(String),
}

/// Why a filename carried no acquisition timestamp.
#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("path `{0}` has no file stem")]
    MissingStem(PathBuf),
    #[error("`{candidate}` does not match YYYYMMDD_HHMMSS: {source}")]
    Unparsable {
        candidate: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Failures reading or writing persisted summaries.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("i/o error on `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("`{day}` is not a YYYY-MM-DD day: {source}")]
    InvalidDay {
        day: String,
        #[source]
        source: chrono::ParseError,
    },
}
