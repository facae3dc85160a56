// THEORY:
// Activity analysis answers "how quickly does one spot of the sensor react?" It
// watches a small square of pixels around a target and records every time the
// observed polarity flips. Events that repeat the previous polarity carry no new
// information about the stimulus and are only counted as redundancies.
//
// The change times feed the temporal-resolution plots: the gaps between
// consecutive changes approximate how fast the sensor follows the stimulus.
//
// Unlike the spatial reader, this pass works in raw sensor coordinates (no Y
// flip) and accepts both polarity spellings (`True` and `1`) on every row.

use crate::core_modules::config::ActivityWatch;
use crate::core_modules::error::{ReadError, Result};
use crate::core_modules::header::{
    POLARITY_COLUMN, TIMESTAMP_COLUMN, X_COLUMN, Y_COLUMN, check_spatial_header, line_of,
    parse_column,
};
use csv::ReaderBuilder;
use log::{debug, info};
use std::io::Read;

/// State changes observed around one pixel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelActivity {
    redundancies: u64,
    change_times_ms: Vec<f64>,
}

impl PixelActivity {
    /// Events inside the watched area that repeated the previous polarity.
    pub fn redundancies(&self) -> u64 {
        self.redundancies
    }

    /// Times of each polarity change in milliseconds, relative to the first change.
    pub fn change_times_ms(&self) -> &[f64] {
        &self.change_times_ms
    }

    /// Gaps between consecutive changes, in milliseconds.
    pub fn intervals_ms(&self) -> Vec<f64> {
        self.change_times_ms.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Mean gap between changes. `None` with fewer than two changes.
    pub fn mean_interval_ms(&self) -> Option<f64> {
        let intervals = self.intervals_ms();
        if intervals.is_empty() {
            return None;
        }
        Some(intervals.iter().sum::<f64>() / intervals.len() as f64)
    }
}

fn polarity_is_on(token: &str) -> bool {
    token == "True" || token == "1"
}

/// Scans a per-event export and records polarity changes inside `watch`'s area.
pub fn analyze_activity<R: Read>(
    source: R,
    source_name: &str,
    watch: &ActivityWatch,
) -> Result<PixelActivity> {
    watch.validate()?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    check_spatial_header(reader.headers()?)?;

    let area = u64::from(watch.area_size);
    let mut last_state: Option<bool> = None;
    let mut redundancies = 0u64;
    // (line, raw timestamp) of each change
    let mut change_timestamps: Vec<(u64, i64)> = Vec::new();

    for record in reader.records() {
        let record = record?;
        let x: i64 = parse_column(&record, X_COLUMN, source_name)?;
        let y: i64 = parse_column(&record, Y_COLUMN, source_name)?;
        if x.abs_diff(watch.pixel_x) >= area || y.abs_diff(watch.pixel_y) >= area {
            continue;
        }

        let state = polarity_is_on(record.get(POLARITY_COLUMN).unwrap_or_default());
        if last_state == Some(state) {
            redundancies += 1;
            continue;
        }

        last_state = Some(state);
        let timestamp: i64 = parse_column(&record, TIMESTAMP_COLUMN, source_name)?;
        change_timestamps.push((line_of(&record), timestamp));
        if watch.max_points.is_some_and(|max| change_timestamps.len() >= max) {
            debug!("{source_name}: collected {} changes, stopping", change_timestamps.len());
            break;
        }
    }

    let origin = change_timestamps.first().map(|&(_, t)| t).unwrap_or_default();
    let change_times_ms = change_timestamps
        .iter()
        .map(|&(line, t)| {
            t.checked_sub(origin)
                .map(|offset| offset as f64 / 1000.0)
                .ok_or_else(|| ReadError::TimestampOutOfRange {
                    source_name: source_name.to_string(),
                    line,
                    first: origin,
                    found: t,
                })
        })
        .collect::<Result<Vec<f64>>>()?;

    info!(
        "{source_name}: {} changes, {redundancies} redundancies around ({}, {})",
        change_timestamps.len(),
        watch.pixel_x,
        watch.pixel_y
    );
    Ok(PixelActivity {
        redundancies,
        change_times_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(body: &str, watch: &ActivityWatch) -> Result<PixelActivity> {
        let csv = format!("On/Off,X,Y,Timestamp\n{body}");
        analyze_activity(csv.as_bytes(), "pixel.csv", watch)
    }

    #[test]
    fn counts_changes_and_redundancies() {
        let body = "True,10,10,1000\n\
                    True,10,10,2000\n\
                    False,11,9,4000\n\
                    False,10,10,5000\n\
                    1,10,10,9000\n";
        let activity = analyze(body, &ActivityWatch::new(10, 10, 2)).expect("valid csv");
        assert_eq!(activity.redundancies(), 2);
        assert_eq!(activity.change_times_ms(), &[0.0, 3.0, 8.0]);
        assert_eq!(activity.intervals_ms(), vec![3.0, 5.0]);
        assert_eq!(activity.mean_interval_ms(), Some(4.0));
    }

    #[test]
    fn area_is_exclusive_and_uses_raw_coordinates() {
        // (12, 10) is exactly `area_size` away and falls outside.
        let body = "True,12,10,0\nFalse,10,11,10\n";
        let activity = analyze(body, &ActivityWatch::new(10, 10, 2)).expect("valid csv");
        assert_eq!(activity.change_times_ms(), &[0.0]);
        assert_eq!(activity.redundancies(), 0);
    }

    #[test]
    fn max_points_stops_collection() {
        let watch = ActivityWatch {
            max_points: Some(2),
            ..ActivityWatch::new(0, 0, 1)
        };
        let body = "1,0,0,0\n0,0,0,1000\n1,0,0,2000\nbad,row\n";
        let activity = analyze(body, &watch).expect("stops before the bad row");
        assert_eq!(activity.change_times_ms(), &[0.0, 1.0]);
    }

    #[test]
    fn no_matching_events_is_not_an_error() {
        let activity = analyze("True,100,100,0\n", &ActivityWatch::new(0, 0, 1)).expect("valid csv");
        assert!(activity.change_times_ms().is_empty());
        assert_eq!(activity.mean_interval_ms(), None);
    }

    #[test]
    fn extreme_coordinates_are_simply_outside() {
        let body = format!("True,{},{},0\nFalse,0,0,5\n", i64::MIN, i64::MAX);
        let activity = analyze(&body, &ActivityWatch::new(0, 0, 1)).expect("valid csv");
        assert_eq!(activity.change_times_ms(), &[0.0]);
    }

    #[test]
    fn extreme_timestamps_are_rejected_not_wrapped() {
        let body = format!("1,0,0,{}\n0,0,0,{}\n", i64::MIN, i64::MAX);
        let err = analyze(&body, &ActivityWatch::new(0, 0, 1)).unwrap_err();
        assert!(matches!(err, ReadError::TimestampOutOfRange { line: 3, .. }));
    }

    #[test]
    fn header_is_checked() {
        let err = analyze_activity("a,b\n".as_bytes(), "p.csv", &ActivityWatch::new(0, 0, 1)).unwrap_err();
        assert!(matches!(err, ReadError::Format { .. }));
    }
}
