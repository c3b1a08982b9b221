// THEORY:
// The batch layer runs the per-image pipeline over a whole collection and turns the
// outcomes into an ordered time series.
//
// Key architectural principles:
// 1.  **Independence**: no image reads or writes another image's intermediate state,
//     so the per-image work can be farmed out to blocking worker tasks with nothing
//     shared but the (read-only) pipeline.
// 2.  **Order-preserving collection**: the parallel run collects results in input
//     order before sorting, so it returns exactly what the sequential run returns.
// 3.  **Local recovery**: an unreadable image is counted and logged, never allowed to
//     fail the batch. An empty input is a valid, empty result.
// 4.  **Explicit ordering of missing timestamps**: records are stably sorted by
//     timestamp with absent timestamps after every present one, in input order.

use crate::pipeline::{ImageOutcome, VolumePipeline, VolumeRecord};
use crate::error::SkipReason;
use futures::stream::{self, StreamExt};
use log::{info, warn};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

/// The result of a batch: ordered records plus the images that produced none.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<VolumeRecord>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
}

impl BatchReport {
    fn from_outcomes(outcomes: impl IntoIterator<Item = ImageOutcome>) -> Self {
        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                ImageOutcome::Estimated(record) => report.records.push(record),
                ImageOutcome::Skipped { image, reason } => report.skipped.push((image, reason)),
            }
        }
        sort_by_timestamp(&mut report.records);
        info!(
            "Processed {} image(s), skipped {}",
            report.records.len(),
            report.skipped.len()
        );
        report
    }
}

/// Runs a `VolumePipeline` over many images.
pub struct BatchAggregator {
    pipeline: Arc<VolumePipeline>,
    workers: usize,
}

impl BatchAggregator {
    pub fn new(pipeline: VolumePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            workers: num_cpus::get().max(1),
        }
    }

    /// Caps the number of images decoded at once by `run_parallel`.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn pipeline(&self) -> &VolumePipeline {
        &self.pipeline
    }

    /// Processes `paths` one after another on the calling thread.
    pub fn run(&self, paths: &[PathBuf]) -> BatchReport {
        BatchReport::from_outcomes(paths.iter().map(|path| self.pipeline.process_path(path)))
    }

    /// Processes `paths` on tokio's blocking pool, at most `workers` at a time.
    pub async fn run_parallel(&self, paths: Vec<PathBuf>) -> BatchReport {
        let outcomes: Vec<ImageOutcome> = stream::iter(paths)
            .map(|path| {
                let pipeline = Arc::clone(&self.pipeline);
                async move {
                    let task_path = path.clone();
                    match tokio::task::spawn_blocking(move || pipeline.process_path(&task_path)).await {
                        Ok(outcome) => outcome,
                        Err(join_error) => {
                            warn!("Worker for {} failed: {}", path.display(), join_error);
                            ImageOutcome::Skipped {
                                image: path,
                                reason: SkipReason::Worker(join_error.to_string()),
                            }
                        }
                    }
                }
            })
            .buffered(self.workers)
            .collect()
            .await;

        BatchReport::from_outcomes(outcomes)
    }
}

/// Stable ascending sort by timestamp; records without one go last, in their
/// original relative order.
pub fn sort_by_timestamp(records: &mut [VolumeRecord]) {
    records.sort_by(|a, b| match (&a.timestamp, &b.timestamp) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
