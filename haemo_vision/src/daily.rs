// THEORY:
// The daily layer condenses a time series of per-image estimates into one row per
// calendar day and smooths the daily totals with a short trailing mean.
//
// Key architectural principles:
// 1.  **Derived, not stored**: a `DailyRecord` has no identity of its own. The whole
//     summary is recomputed from the full set of per-image records every time.
// 2.  **Calendar grouping**: records without a timestamp cannot be placed on a day
//     and are dropped here (they are still present in the per-image summary).
// 3.  **Sequence-position window**: the rolling mean covers the current day and up
//     to `ROLLING_WINDOW - 1` preceding days *that appear in the data*. A day with no
//     photographs does not occupy a slot, so a gap widens the calendar span the mean
//     covers. The window shrinks at the start of the series instead of padding.

use crate::pipeline::VolumeRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

pub const ROLLING_WINDOW: usize = 3;

/// Summed volumes for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub day: NaiveDate,
    pub absorbed_ml: f64,
    pub standing_ml: f64,
    pub total_ml: f64,
    /// Mean `total_ml` over this day and up to two preceding days in the series.
    pub rolling_total_ml: f64,
}

impl DailyRecord {
    /// The day expressed as a single record stamped at midnight, so a daily summary
    /// can be fed back through `summarize`.
    pub fn as_volume_record(&self) -> VolumeRecord {
        VolumeRecord {
            image_name: self.day.to_string(),
            timestamp: self.day.and_hms_opt(0, 0, 0),
            absorbed_area_cm2: 0.0,
            standing_area_cm2: 0.0,
            absorbed_ml: self.absorbed_ml,
            standing_ml: self.standing_ml,
            total_ml: self.total_ml,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct DaySums {
    absorbed_ml: f64,
    standing_ml: f64,
    total_ml: f64,
}

/// Groups `records` by calendar day (ascending) and adds the rolling total.
pub fn summarize(records: &[VolumeRecord]) -> Vec<DailyRecord> {
    let mut by_day: BTreeMap<NaiveDate, DaySums> = BTreeMap::new();
    for record in records {
        let Some(timestamp) = record.timestamp else {
            continue;
        };
        let sums = by_day.entry(timestamp.date()).or_default();
        sums.absorbed_ml += record.absorbed_ml;
        sums.standing_ml += record.standing_ml;
        sums.total_ml += record.total_ml;
    }

    let mut window: VecDeque<f64> = VecDeque::with_capacity(ROLLING_WINDOW);
    by_day
        .into_iter()
        .map(|(day, sums)| {
            window.push_back(sums.total_ml);
            if window.len() > ROLLING_WINDOW {
                window.pop_front();
            }
            let rolling_total_ml = window.iter().sum::<f64>() / window.len() as f64;
            DailyRecord {
                day,
                absorbed_ml: sums.absorbed_ml,
                standing_ml: sums.standing_ml,
                total_ml: sums.total_ml,
                rolling_total_ml,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn stamp(day: u32, hour: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 3, day)?.and_hms_opt(hour, 0, 0)
    }

    fn record(timestamp: Option<NaiveDateTime>, absorbed_ml: f64, standing_ml: f64) -> VolumeRecord {
        VolumeRecord {
            image_name: String::from("img.jpg"),
            timestamp,
            absorbed_area_cm2: 0.0,
            standing_area_cm2: 0.0,
            absorbed_ml,
            standing_ml,
            total_ml: absorbed_ml + standing_ml,
        }
    }

    #[test]
    fn same_day_records_are_summed() {
        let daily = summarize(&[record(stamp(4, 8), 4.0, 6.0), record(stamp(4, 20), 5.0, 15.0)]);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].day, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(daily[0].total_ml, 30.0);
        assert_eq!(daily[0].absorbed_ml, 9.0);
        assert_eq!(daily[0].standing_ml, 21.0);
        assert_eq!(daily[0].rolling_total_ml, 30.0);
    }

    #[test]
    fn rolling_window_shrinks_at_the_start_then_slides() {
        let daily = summarize(&[
            record(stamp(4, 9), 0.0, 4.0),
            record(stamp(1, 9), 0.0, 1.0),
            record(stamp(3, 9), 0.0, 3.0),
            record(stamp(2, 9), 0.0, 2.0),
        ]);
        let rolling: Vec<f64> = daily.iter().map(|d| d.rolling_total_ml).collect();
        assert_eq!(rolling, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn calendar_gaps_do_not_occupy_window_slots() {
        // Days 1, 10 and 20: the third mean spans twenty calendar days.
        let daily = summarize(&[
            record(stamp(1, 9), 0.0, 3.0),
            record(stamp(10, 9), 0.0, 6.0),
            record(stamp(20, 9), 0.0, 9.0),
        ]);
        assert_eq!(daily[2].rolling_total_ml, 6.0);
    }

    #[test]
    fn records_without_timestamp_are_dropped() {
        let daily = summarize(&[record(None, 1.0, 1.0), record(stamp(2, 9), 1.0, 2.0)]);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].total_ml, 3.0);
    }

    #[test]
    fn empty_input_gives_empty_summary() {
        assert!(summarize(&[]).is_empty());
        assert!(summarize(&[record(None, 1.0, 1.0)]).is_empty());
    }

    #[test]
    fn summarizing_a_summary_reproduces_the_daily_sums() {
        let daily = summarize(&[
            record(stamp(1, 9), 1.25, 2.5),
            record(stamp(1, 18), 0.75, 0.5),
            record(stamp(2, 9), 3.0, 1.0),
            record(stamp(3, 9), 0.5, 0.5),
        ]);
        let fed_back: Vec<VolumeRecord> = daily.iter().map(DailyRecord::as_volume_record).collect();
        assert_eq!(summarize(&fed_back), daily);
    }
}
