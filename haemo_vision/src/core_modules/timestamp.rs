// THEORY:
// Acquisition time is carried in the filename, not in image metadata. Cameras in the
// field name files `YYYYMMDD_HHMMSS[...]`, sometimes with extra tokens in between
// (`20240325_cam2_091524.jpg`). The date is therefore taken from the first
// underscore-delimited token of the stem and the time from the last, and the pair is
// parsed against one fixed pattern. A name that does not fit is not an error for the
// batch: the caller keeps the record and simply has no timestamp for it.

use crate::error::TimestampError;
use chrono::NaiveDateTime;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Parses the acquisition time encoded in `path`'s file name.
pub fn extract(path: impl AsRef<Path>) -> Result<NaiveDateTime, TimestampError> {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .ok_or_else(|| TimestampError::MissingStem(path.to_path_buf()))?;

    let date_token = stem.split('_').next().unwrap_or_default();
    let time_token = stem.rsplit('_').next().unwrap_or_default();
    let candidate = format!("{date_token}_{time_token}");

    NaiveDateTime::parse_from_str(&candidate, TIMESTAMP_FORMAT)
        .map_err(|source| TimestampError::Unparsable { candidate, source })
}
