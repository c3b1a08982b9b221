// THEORY:
// Persistence sits outside the estimation core: it finds the images to feed the
// batch and stores what the batch and the daily layer computed. Both summaries are
// flat CSV tables with fixed headers so they can be opened in a spreadsheet or fed
// to a plotting tool. Writers take the complete, already computed summary; nothing
// is streamed out while estimation is still running.

use crate::daily::DailyRecord;
use crate::error::SummaryError;
use crate::pipeline::VolumeRecord;
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const DEFAULT_SUMMARY_FILE: &str = "stain_dual_volume_summary.csv";
pub const DEFAULT_DAILY_FILE: &str = "daily_summary.csv";

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DAY_FORMAT: &str = "%Y-%m-%d";

/// One row of the per-image summary.
#[derive(Debug, Serialize, Deserialize)]
struct SummaryRow {
    image: String,
    date: String,
    absorbed_cm2: f64,
    standing_cm2: f64,
    #[serde(rename = "absorbed_mL")]
    absorbed_ml: f64,
    #[serde(rename = "standing_mL")]
    standing_ml: f64,
    #[serde(rename = "total_mL")]
    total_ml: f64,
}

impl From<&VolumeRecord> for SummaryRow {
    fn from(record: &VolumeRecord) -> Self {
        Self {
            image: record.image_name.clone(),
            date: record
                .timestamp
                .map(|t| t.format(DATE_TIME_FORMAT).to_string())
                .unwrap_or_default(),
            absorbed_cm2: record.absorbed_area_cm2,
            standing_cm2: record.standing_area_cm2,
            absorbed_ml: record.absorbed_ml,
            standing_ml: record.standing_ml,
            total_ml: record.total_ml,
        }
    }
}

impl From<SummaryRow> for VolumeRecord {
    fn from(row: SummaryRow) -> Self {
        Self {
            timestamp: parse_date_lenient(&row.date),
            image_name: row.image,
            absorbed_area_cm2: row.absorbed_cm2,
            standing_area_cm2: row.standing_cm2,
            absorbed_ml: row.absorbed_ml,
            standing_ml: row.standing_ml,
            total_ml: row.total_ml,
        }
    }
}

/// One row of the daily summary.
#[derive(Debug, Serialize, Deserialize)]
struct DailyRow {
    day: String,
    #[serde(rename = "absorbed_mL")]
    absorbed_ml: f64,
    #[serde(rename = "standing_mL")]
    standing_ml: f64,
    #[serde(rename = "total_mL")]
    total_ml: f64,
    #[serde(rename = "rolling_total_mL")]
    rolling_total_ml: f64,
}

impl From<&DailyRecord> for DailyRow {
    fn from(record: &DailyRecord) -> Self {
        Self {
            day: record.day.format(DAY_FORMAT).to_string(),
            absorbed_ml: record.absorbed_ml,
            standing_ml: record.standing_ml,
            total_ml: record.total_ml,
            rolling_total_ml: record.rolling_total_ml,
        }
    }
}

impl TryFrom<DailyRow> for DailyRecord {
    type Error = SummaryError;

    fn try_from(row: DailyRow) -> Result<Self, Self::Error> {
        let day = NaiveDate::parse_from_str(row.day.trim(), DAY_FORMAT)
            .map_err(|source| SummaryError::InvalidDay { day: row.day.clone(), source })?;
        Ok(Self {
            day,
            absorbed_ml: row.absorbed_ml,
            standing_ml: row.standing_ml,
            total_ml: row.total_ml,
            rolling_total_ml: row.rolling_total_ml,
        })
    }
}

/// Accepts the formats a hand-edited or re-exported summary is likely to carry.
/// Anything else, including an empty cell, is treated as missing.
pub fn parse_date_lenient(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, DAY_FORMAT)
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
        })
}

/// Lists the image files directly inside `dir`, sorted by file name.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>, SummaryError> {
    let io_error = |source: io::Error| SummaryError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut images = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && has_image_extension(&path) {
            images.push(path);
        }
    }
    images.sort();
    debug!("Found {} image(s) in {}", images.len(), dir.display());
    Ok(images)
}

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

pub fn write_summary_to<W: io::Write>(writer: W, records: &[VolumeRecord]) -> Result<(), SummaryError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(SummaryRow::from(record))?;
    }
    if records.is_empty() {
        csv_writer.write_record([
            "image",
            "date",
            "absorbed_cm2",
            "standing_cm2",
            "absorbed_mL",
            "standing_mL",
            "total_mL",
        ])?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_summary(path: &Path, records: &[VolumeRecord]) -> Result<(), SummaryError> {
    let file = create(path)?;
    write_summary_to(file, records)
}

pub fn read_summary_from<R: io::Read>(reader: R) -> Result<Vec<VolumeRecord>, SummaryError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in csv_reader.deserialize::<SummaryRow>() {
        records.push(VolumeRecord::from(row?));
    }
    Ok(records)
}

pub fn read_summary(path: &Path) -> Result<Vec<VolumeRecord>, SummaryError> {
    read_summary_from(open(path)?)
}

pub fn read_daily_from<R: io::Read>(reader: R) -> Result<Vec<DailyRecord>, SummaryError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut days = Vec::new();
    for row in csv_reader.deserialize::<DailyRow>() {
        days.push(DailyRecord::try_from(row?)?);
    }
    Ok(days)
}

pub fn read_daily(path: &Path) -> Result<Vec<DailyRecord>, SummaryError> {
    read_daily_from(open(path)?)
}

/// Loads either kind of summary as per-image records. A daily summary is told
/// apart by its `day` column; each day becomes one record stamped at midnight.
pub fn read_records_from<R: io::Read>(reader: R) -> Result<Vec<VolumeRecord>, SummaryError> {
    let mut buffered = io::BufReader::new(reader);
    let mut header = String::new();
    io::BufRead::read_line(&mut buffered, &mut header).map_err(csv::Error::from)?;
    let is_daily = header.trim_end().split(',').next() == Some("day");
    let replay = io::Read::chain(header.as_bytes(), buffered);

    if is_daily {
        debug!("Reading a daily summary");
        Ok(read_daily_from(replay)?
            .iter()
            .map(DailyRecord::as_volume_record)
            .collect())
    } else {
        read_summary_from(replay)
    }
}

pub fn read_records(path: &Path) -> Result<Vec<VolumeRecord>, SummaryError> {
    read_records_from(open(path)?)
}

pub fn write_daily_to<W: io::Write>(writer: W, days: &[DailyRecord]) -> Result<(), SummaryError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for day in days {
        csv_writer.serialize(DailyRow::from(day))?;
    }
    if days.is_empty() {
        csv_writer.write_record(["day", "absorbed_mL", "standing_mL", "total_mL", "rolling_total_mL"])?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_daily(path: &Path, days: &[DailyRecord]) -> Result<(), SummaryError> {
    let file = create(path)?;
    write_daily_to(file, days)
}

fn open(path: &Path) -> Result<fs::File, SummaryError> {
    fs::File::open(path).map_err(|source| SummaryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create(path: &Path) -> Result<fs::File, SummaryError> {
    fs::File::create(path).map_err(|source| SummaryError::Io {
        path: path.to_path_buf(),
        source,
    })
}
