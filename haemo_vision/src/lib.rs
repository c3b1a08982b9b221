// THEORY:
// This file is the main entry point for the `haemo_vision` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (the CLI in `main.rs` and the
// mask inspector crate).
//
// The primary goal is to export the `VolumePipeline`, the `BatchAggregator` and
// the daily `summarize` step, together with their data structures
// (`PipelineConfig`, `VolumeRecord`, `DailyRecord`), as the high-level interface
// of the estimation engine. The leaf analysers in `core_modules` stay public so
// tools can reuse a single stage, such as segmentation for debug overlays.

pub mod core_modules;
pub mod daily;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod summary_io;

pub use daily::{summarize, DailyRecord};
pub use error::{ConfigError, SkipReason, SummaryError, TimestampError};
pub use parallel_pipeline::{BatchAggregator, BatchReport};
pub use pipeline::{ImageOutcome, PipelineConfig, SegmentationStrategy, VolumePipeline, VolumeRecord};
