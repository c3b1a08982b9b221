use anyhow::{Context, Result};
use clap::Parser;
use haemo_vision::pipeline::load_image;
use haemo_vision::summary_io::read_summary;
use haemo_vision::{PipelineConfig, SegmentationStrategy, VolumePipeline};
use haemo_vision_inspector::{render_panel, select_extremes, DEFAULT_EXTREME_COUNT};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "haemo_vision_inspector")]
#[command(version, about = "Render mask panels for the highest and lowest volume images", long_about = None)]
struct Args {
    /// Per-image summary CSV
    #[arg(value_name = "SUMMARY_CSV")]
    summary: PathBuf,

    /// Directory holding the images named in the summary
    #[arg(value_name = "IMAGE_DIR")]
    image_dir: PathBuf,

    /// Output directory for the panels
    #[arg(short, long, value_name = "DIR", default_value = "debug")]
    out: PathBuf,

    /// Images to render from each end of the volume range
    #[arg(short, default_value_t = DEFAULT_EXTREME_COUNT)]
    n: usize,

    /// Segmentation strategy used to regenerate the masks
    #[arg(long, value_name = "STRATEGY", default_value = "percentile")]
    strategy: SegmentationStrategy,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let records = read_summary(&args.summary)
        .with_context(|| format!("Failed to read summary {}", args.summary.display()))?;
    let pipeline = VolumePipeline::new(PipelineConfig {
        strategy: args.strategy,
        ..PipelineConfig::default()
    })?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create output directory {}", args.out.display()))?;

    let extremes = select_extremes(&records, args.n);
    let mut written = 0usize;
    for (file_name, source) in extremes.targets(&args.image_dir) {
        let image = match load_image(&source) {
            Ok(image) => image,
            Err(reason) => {
                warn!("Skipping {}: {}", source.display(), reason);
                continue;
            }
        };
        let panel = render_panel(&image, &pipeline.segment(&image));
        let destination = args.out.join(&file_name);
        panel
            .save(&destination)
            .with_context(|| format!("Failed to write {}", destination.display()))?;
        info!("{} -> {}", source.display(), destination.display());
        written += 1;
    }

    println!("Saved {} panel(s) to '{}'", written, args.out.display());
    Ok(())
}
