use haemo_vision::summary_io::{discover_images, read_records, read_summary, write_daily, write_summary};
use haemo_vision::{summarize, BatchAggregator, PipelineConfig, SkipReason, VolumePipeline};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;

/// White card, 200 px across, with a dark square of side `side` px.
fn write_card(path: &Path, side: u32) {
    let image = RgbImage::from_fn(200, 120, |x, y| {
        if (20..20 + side).contains(&x) && (20..20 + side).contains(&y) {
            Rgb([30, 0, 0])
        } else {
            Rgb([245, 245, 245])
        }
    });
    image.save(path).unwrap();
}

fn aggregator() -> BatchAggregator {
    BatchAggregator::new(VolumePipeline::new(PipelineConfig::default()).unwrap()).with_workers(1)
}

#[test]
fn corrupt_file_is_skipped_and_valid_file_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    write_card(&dir.path().join("20240301_080000.png"), 41);
    fs::write(dir.path().join("20240301_090000.jpg"), b"definitely not a jpeg").unwrap();

    let images = discover_images(dir.path()).unwrap();
    assert_eq!(images.len(), 2);

    let report = aggregator().run(&images);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(matches!(report.skipped[0].1, SkipReason::Unreadable(_)));
    assert_eq!(report.records[0].image_name, "20240301_080000.png");
}

#[test]
fn non_image_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write_card(&dir.path().join("20240301_080000.png"), 21);
    fs::write(dir.path().join("notes.txt"), b"field notes").unwrap();
    fs::create_dir(dir.path().join("nested.png")).unwrap();

    let images = discover_images(dir.path()).unwrap();
    assert_eq!(images, vec![dir.path().join("20240301_080000.png")]);
}

#[test]
fn empty_directory_gives_empty_series_and_empty_daily_summary() {
    let dir = tempfile::tempdir().unwrap();
    let images = discover_images(dir.path()).unwrap();
    let report = aggregator().run(&images);
    assert!(report.records.is_empty());
    assert!(summarize(&report.records).is_empty());
}

#[test]
fn batch_orders_by_timestamp_and_daily_summary_sums_each_day() {
    let dir = tempfile::tempdir().unwrap();
    // File names sort differently from acquisition times on purpose.
    write_card(&dir.path().join("20240302_070000.png"), 41);
    write_card(&dir.path().join("20240301_200000.png"), 21);
    write_card(&dir.path().join("20240301_060000.png"), 31);
    write_card(&dir.path().join("scan.png"), 11);

    let report = aggregator().run(&discover_images(dir.path()).unwrap());
    let names: Vec<&str> = report.records.iter().map(|r| r.image_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["20240301_060000.png", "20240301_200000.png", "20240302_070000.png", "scan.png"]
    );
    assert!(report.records[3].timestamp.is_none());
    for record in &report.records {
        assert!((record.total_ml - (record.absorbed_ml + record.standing_ml)).abs() < 1e-9);
        assert!(record.absorbed_area_cm2 >= 0.0);
    }

    let daily = summarize(&report.records);
    assert_eq!(daily.len(), 2);
    let first_day_total = report.records[0].total_ml + report.records[1].total_ml;
    assert!((daily[0].total_ml - first_day_total).abs() < 1e-9);
    assert!((daily[1].rolling_total_ml - (daily[0].total_ml + daily[1].total_ml) / 2.0).abs() < 1e-9);
}

#[test]
fn persisted_summary_feeds_the_daily_step() {
    let dir = tempfile::tempdir().unwrap();
    write_card(&dir.path().join("20240305_101010.png"), 41);
    write_card(&dir.path().join("20240305_202020.png"), 41);

    let report = aggregator().run(&discover_images(dir.path()).unwrap());
    let summary_path = dir.path().join("summary.csv");
    write_summary(&summary_path, &report.records).unwrap();

    let reloaded = read_summary(&summary_path).unwrap();
    assert_eq!(reloaded, report.records);

    let daily = summarize(&reloaded);
    assert_eq!(daily.len(), 1);
    let daily_path = dir.path().join("daily.csv");
    write_daily(&daily_path, &daily).unwrap();
    let text = fs::read_to_string(&daily_path).unwrap();
    assert!(text.starts_with("day,absorbed_mL,standing_mL,total_mL,rolling_total_mL"));
    assert!(text.contains("2024-03-05,"));

    // The daily file is itself valid input for the daily step.
    assert_eq!(summarize(&read_records(&daily_path).unwrap()), daily);
}

#[tokio::test]
async fn parallel_run_matches_sequential_run() {
    let dir = tempfile::tempdir().unwrap();
    for (name, side) in [
        ("20240310_120000.png", 41),
        ("20240309_120000.png", 31),
        ("misc.png", 21),
        ("20240311_120000.png", 11),
        ("other.png", 15),
    ] {
        write_card(&dir.path().join(name), side);
    }
    fs::write(dir.path().join("20240312_120000.png"), b"\x89PNG truncated").unwrap();
    let images = discover_images(dir.path()).unwrap();

    let sequential = aggregator().run(&images);
    let parallel = BatchAggregator::new(VolumePipeline::new(PipelineConfig::default()).unwrap())
        .with_workers(4)
        .run_parallel(images)
        .await;

    assert_eq!(parallel.records, sequential.records);
    assert_eq!(parallel.skipped.len(), 1);
}
