// THEORY:
// The chunk reader turns a per-window count export into parallel sequences of
// on/off/all counts plus the start time of each window.
//
// The camera occasionally "bugs out" and reports an absurd number of events for a
// single window. Any window whose total exceeds `GLITCH_THRESHOLD` is treated as
// corrupted, and all three of its counts are replaced with the floor average of
// every previously accepted value in the same sequence. The substituted values
// then become part of the history for later substitutions.
//
// A glitch on the very first window has no history to average. That read fails
// rather than inventing a value.

use crate::core_modules::config::ChunkConfig;
use crate::core_modules::error::{ReadError, Result};
use crate::core_modules::header::{check_count_header, line_of, parse_column};
use crate::core_modules::record::ChunkRecord;
use csv::ReaderBuilder;
use log::{info, warn};
use std::io::Read;

/// Totals above this are sensor glitches, not real activity.
pub const GLITCH_THRESHOLD: u64 = 8000;

const ON_COLUMN: usize = 0;
const OFF_COLUMN: usize = 1;
const ALL_COLUMN: usize = 2;

/// Sum and count of a sequence's accepted values.
///
/// The sum is kept wider than the counts so a run of `u64::MAX` values cannot
/// overflow it.
#[derive(Debug, Clone, Copy, Default)]
struct RunningAverage {
    sum: u128,
    count: u64,
}

impl RunningAverage {
    fn push(&mut self, value: u64) {
        self.sum += u128::from(value);
        self.count += 1;
    }

    /// Floor average of everything pushed so far.
    fn floor(&self) -> Option<u64> {
        // The average of u64 values always fits back into a u64.
        self.sum
            .checked_div(u128::from(self.count))
            .map(|average| average as u64)
    }
}

/// Column-wise collection of windows produced by [`ingest_chunks`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCsvData {
    source_name: String,
    time_offsets: Vec<f64>,
    on_counts: Vec<u64>,
    off_counts: Vec<u64>,
    all_counts: Vec<u64>,
    glitched_rows: usize,
}

impl ChunkCsvData {
    fn new(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            time_offsets: Vec::new(),
            on_counts: Vec::new(),
            off_counts: Vec::new(),
            all_counts: Vec::new(),
            glitched_rows: 0,
        }
    }

    /// Identifier of the source the windows were read from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn len(&self) -> usize {
        self.all_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_counts.is_empty()
    }

    /// Start of each window in seconds. The first window starts at 0.
    pub fn time_offsets(&self) -> &[f64] {
        &self.time_offsets
    }

    pub fn on_counts(&self) -> &[u64] {
        &self.on_counts
    }

    pub fn off_counts(&self) -> &[u64] {
        &self.off_counts
    }

    pub fn all_counts(&self) -> &[u64] {
        &self.all_counts
    }

    /// How many windows had their counts replaced by the running average.
    pub fn glitched_rows(&self) -> usize {
        self.glitched_rows
    }

    pub fn records(&self) -> impl Iterator<Item = ChunkRecord> + '_ {
        (0..self.len()).map(move |i| ChunkRecord {
            time_offset: self.time_offsets[i],
            on_count: self.on_counts[i],
            off_count: self.off_counts[i],
            all_count: self.all_counts[i],
        })
    }
}

/// Reads a per-window count export from `source`.
///
/// Columns 0, 1 and 2 hold the on, off and total counts. Window `i` (0-based)
/// starts at `i * config.time_window_us` microseconds, reported in seconds.
///
/// # Errors
///
/// - [`ReadError::Format`] if the header is blank or a field does not mention "count".
/// - [`ReadError::EmptyData`] if there is a header but no data row.
/// - [`ReadError::MalformedRow`] if a count is missing or not a non-negative integer.
/// - [`ReadError::GlitchWithoutHistory`] if the first window is already a glitch.
pub fn ingest_chunks<R: Read>(source: R, source_name: &str, config: &ChunkConfig) -> Result<ChunkCsvData> {
    config.validate()?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    check_count_header(reader.headers()?)?;

    let window_secs = config.time_window_secs();
    let mut data = ChunkCsvData::new(source_name);
    let mut on_history = RunningAverage::default();
    let mut off_history = RunningAverage::default();
    let mut all_history = RunningAverage::default();

    for (row_index, record) in reader.records().enumerate() {
        if config.max_rows.is_some_and(|max| data.len() >= max) {
            break;
        }

        let record = record?;
        let mut on: u64 = parse_column(&record, ON_COLUMN, source_name)?;
        let mut off: u64 = parse_column(&record, OFF_COLUMN, source_name)?;
        let mut all: u64 = parse_column(&record, ALL_COLUMN, source_name)?;

        if all > GLITCH_THRESHOLD {
            let line = line_of(&record);
            let averages = (on_history.floor(), off_history.floor(), all_history.floor());
            let (Some(avg_on), Some(avg_off), Some(avg_all)) = averages else {
                return Err(ReadError::GlitchWithoutHistory {
                    source_name: source_name.to_string(),
                    line,
                });
            };
            warn!("{source_name}:{line}: {all} events exceeds {GLITCH_THRESHOLD}, using running average");
            (on, off, all) = (avg_on, avg_off, avg_all);
            data.glitched_rows += 1;
        }

        on_history.push(on);
        off_history.push(off);
        all_history.push(all);

        data.time_offsets.push(row_index as f64 * window_secs);
        data.on_counts.push(on);
        data.off_counts.push(off);
        data.all_counts.push(all);
    }

    if data.is_empty() {
        return Err(ReadError::EmptyData {
            source_name: source_name.to_string(),
        });
    }

    info!(
        "{source_name}: read {} windows ({} glitched)",
        data.len(),
        data.glitched_rows
    );
    Ok(data)
}
