use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use haemo_vision::summary_io::{self, DEFAULT_DAILY_FILE, DEFAULT_SUMMARY_FILE};
use haemo_vision::{summarize, BatchAggregator, PipelineConfig, SegmentationStrategy, VolumePipeline};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "haemo_vision")]
#[command(version, about = "Estimate deposited blood volume from timestamped photographs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate every image in a directory and write the per-image summary
    Analyze {
        /// Directory containing .jpg/.jpeg/.png images
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Per-image summary CSV
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_SUMMARY_FILE)]
        out: PathBuf,

        /// Also write the daily summary CSV here
        #[arg(long, value_name = "FILE")]
        daily_out: Option<PathBuf>,

        /// JSON pipeline configuration; flags below override it
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Segmentation strategy: "fixed_threshold" (default) or "percentile"
        #[arg(long, value_name = "STRATEGY")]
        strategy: Option<SegmentationStrategy>,

        /// Physical width, in cm, covered by each image's horizontal extent
        #[arg(long, value_name = "CM")]
        known_width_cm: Option<f64>,

        /// Number of images processed in parallel (defaults to the CPU count)
        #[arg(short = 'j', long, value_name = "N")]
        threads: Option<usize>,
    },

    /// Group a per-image summary by day and add the 3-day rolling total
    Daily {
        /// Per-image summary written by `analyze`, or a daily summary written by `daily`
        #[arg(value_name = "SUMMARY")]
        input: PathBuf,

        /// Daily summary CSV
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_DAILY_FILE)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            input,
            out,
            daily_out,
            config,
            strategy,
            known_width_cm,
            threads,
        } => {
            let mut pipeline_config = load_config(config.as_deref())?;
            if let Some(strategy) = strategy {
                pipeline_config.strategy = strategy;
            }
            if let Some(width) = known_width_cm {
                pipeline_config.known_width_cm = width;
            }
            cmd_analyze(&input, &out, daily_out.as_deref(), pipeline_config, threads).await
        }
        Commands::Daily { input, out } => cmd_daily(&input, &out),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse config file {}", path.display()))
}

async fn cmd_analyze(
    input: &Path,
    out: &Path,
    daily_out: Option<&Path>,
    config: PipelineConfig,
    threads: Option<usize>,
) -> Result<()> {
    let pipeline = VolumePipeline::new(config).context("Invalid pipeline configuration")?;
    info!(
        "Using {} segmentation, {} cm reference width",
        pipeline.config().strategy,
        pipeline.config().known_width_cm
    );

    let images = summary_io::discover_images(input)
        .with_context(|| format!("Failed to list images in {}", input.display()))?;

    let mut aggregator = BatchAggregator::new(pipeline);
    if let Some(threads) = threads {
        aggregator = aggregator.with_workers(threads);
    }

    let report = if aggregator.workers() > 1 {
        aggregator.run_parallel(images).await
    } else {
        aggregator.run(&images)
    };

    // Everything is computed before anything is written.
    let daily = daily_out.map(|_| summarize(&report.records));

    summary_io::write_summary(out, &report.records)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    if let (Some(path), Some(days)) = (daily_out, daily.as_ref()) {
        summary_io::write_daily(path, days).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Daily summary ({} day(s)) saved to '{}'", days.len(), path.display());
    }

    println!(
        "Processed {} image(s), skipped {}. CSV saved to '{}'",
        report.records.len(),
        report.skipped.len(),
        out.display()
    );
    Ok(())
}

fn cmd_daily(input: &Path, out: &Path) -> Result<()> {
    let records = summary_io::read_records(input)
        .with_context(|| format!("Failed to read summary {}", input.display()))?;
    let days = summarize(&records);
    summary_io::write_daily(out, &days).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("Saved daily summary ({} day(s)) to: {}", days.len(), out.display());
    Ok(())
}
