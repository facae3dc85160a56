// THEORY:
// The spatial reader turns a per-event export (`On/Off,X,Y,Timestamp`) into a
// column-wise collection of events. It is a single linear pass:
//
// 1.  **Schema gate**: the header must match literally before any data is read.
// 2.  **Warm-up skip**: the first `skip_rows` rows are discarded. Sensors tend to
//     emit garbage right after they start recording.
// 3.  **Anchoring**: the first retained row fixes two things for the rest of the
//     pass: the timestamp origin (so output time starts at 0) and the polarity
//     encoding. Exports write polarity either as `True`/`False` or as `1`/`-1`,
//     and the encoding is decided once from that first row, never per row.
// 4.  **Cutoff**: the pass ends quietly at the first row whose normalized
//     timestamp exceeds the configured time limit. A partial read is a valid read.
//
// Coordinates are flipped on the Y axis so the origin sits at the bottom-left of
// the frame, which is what the plotting collaborators expect.

use crate::core_modules::config::{PolarityStorage, SpatialConfig};
use crate::core_modules::error::{ReadError, Result};
use crate::core_modules::header::{
    POLARITY_COLUMN, TIMESTAMP_COLUMN, X_COLUMN, Y_COLUMN, check_spatial_header, line_of,
    parse_column,
};
use crate::core_modules::record::{PolarityColor, SpatialEvent, flip_y};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use std::io::Read;

/// How a given export spells a positive ("on") polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruthyToken {
    /// Polarity is written as `True`/`False`.
    TrueLiteral,
    /// Polarity is written numerically; only `1` is positive.
    One,
}

impl TruthyToken {
    /// Picks the encoding from a single polarity token.
    pub fn detect(token: &str) -> Self {
        match token {
            "True" | "False" => TruthyToken::TrueLiteral,
            _ => TruthyToken::One,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TruthyToken::TrueLiteral => "True",
            TruthyToken::One => "1",
        }
    }

    pub fn is_on(self, token: &str) -> bool {
        token == self.as_str()
    }
}

/// Column-wise collection of events produced by [`ingest_spatial`].
///
/// Every stored sequence has the same length. The polarity sequences are only
/// populated when the read's [`PolarityStorage`] asked for them.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialCsvData {
    source_name: String,
    storage: PolarityStorage,
    truthy: TruthyToken,
    polarities: Vec<bool>,
    polarity_colors: Vec<PolarityColor>,
    x_positions: Vec<i32>,
    y_positions: Vec<i32>,
    timestamps: Vec<i64>,
}

impl SpatialCsvData {
    fn new(source_name: &str, storage: PolarityStorage, truthy: TruthyToken) -> Self {
        Self {
            source_name: source_name.to_string(),
            storage,
            truthy,
            polarities: Vec::new(),
            polarity_colors: Vec::new(),
            x_positions: Vec::new(),
            y_positions: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    fn push(&mut self, polarity: bool, x: i32, y: i32, timestamp: i64) {
        self.x_positions.push(x);
        self.y_positions.push(y);
        self.timestamps.push(timestamp);

        if self.storage.keeps_bool() {
            self.polarities.push(polarity);
        }
        if self.storage.keeps_color() {
            self.polarity_colors.push(PolarityColor::from(polarity));
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn storage(&self) -> PolarityStorage {
        self.storage
    }

    /// The polarity encoding detected from the first retained row.
    pub fn truthy_token(&self) -> TruthyToken {
        self.truthy
    }

    /// Number of events read.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Boolean polarities. Empty unless the storage keeps booleans.
    pub fn polarities(&self) -> &[bool] {
        &self.polarities
    }

    /// Color-tagged polarities. Empty unless the storage keeps colors.
    pub fn polarity_colors(&self) -> &[PolarityColor] {
        &self.polarity_colors
    }

    pub fn x_positions(&self) -> &[i32] {
        &self.x_positions
    }

    /// Flipped Y positions (`FRAME_HEIGHT - y_raw`).
    pub fn y_positions(&self) -> &[i32] {
        &self.y_positions
    }

    /// Microseconds since the first retained event.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Row-wise view over the stored columns.
    pub fn events(&self) -> impl Iterator<Item = SpatialEvent> + '_ {
        (0..self.len()).map(move |i| SpatialEvent {
            polarity: self
                .polarities
                .get(i)
                .copied()
                .or_else(|| self.polarity_colors.get(i).map(|c| *c == PolarityColor::Green)),
            x: self.x_positions[i],
            y: self.y_positions[i],
            timestamp: self.timestamps[i],
        })
    }
}

/// Reads a per-event export from `source`.
///
/// `source_name` is only used in error messages and logs.
///
/// # Errors
///
/// - [`ReadError::Format`] if the header is not exactly `On/Off,X,Y,Timestamp`.
/// - [`ReadError::EmptyData`] if no data row remains after skipping.
/// - [`ReadError::MalformedRow`] if a coordinate or timestamp is not an integer.
/// - [`ReadError::TimestampRegression`] if a timestamp is earlier than the one before it.
/// - [`ReadError::TimestampOutOfRange`] if a timestamp's offset from the first one does
///   not fit in an `i64`.
///
/// # Ordering
///
/// Output timestamps are guaranteed non-decreasing. A source with even one
/// out-of-order timestamp before the cutoff is rejected as a whole instead of
/// producing negative or shuffled offsets.
pub fn ingest_spatial<R: Read>(
    source: R,
    source_name: &str,
    config: &SpatialConfig,
) -> Result<SpatialCsvData> {
    config.validate()?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    check_spatial_header(reader.headers()?)?;

    let mut records = reader.into_records();
    for _ in 0..config.skip_rows {
        match records.next() {
            Some(record) => {
                record?;
            }
            None => break,
        }
    }

    let first = match records.next() {
        Some(record) => record?,
        None => {
            return Err(ReadError::EmptyData {
                source_name: source_name.to_string(),
            });
        }
    };

    let first_timestamp: i64 = parse_column(&first, TIMESTAMP_COLUMN, source_name)?;
    let truthy = TruthyToken::detect(first.get(POLARITY_COLUMN).unwrap_or_default());
    let time_limit = config.time_limit_us();
    debug!(
        "{source_name}: skipped {} rows, first timestamp {first_timestamp}, polarity encoded as {:?}",
        config.skip_rows, truthy
    );

    let mut data = SpatialCsvData::new(source_name, config.polarity_storage, truthy);
    let mut previous_timestamp = first_timestamp;

    for record in std::iter::once(Ok(first)).chain(records) {
        let record: StringRecord = record?;
        let timestamp: i64 = parse_column(&record, TIMESTAMP_COLUMN, source_name)?;
        let normalized = timestamp.checked_sub(first_timestamp).ok_or_else(|| {
            ReadError::TimestampOutOfRange {
                source_name: source_name.to_string(),
                line: line_of(&record),
                first: first_timestamp,
                found: timestamp,
            }
        })?;

        if time_limit.is_some_and(|limit| normalized > limit) {
            debug!(
                "{source_name}: time limit reached at line {} ({normalized}us)",
                line_of(&record)
            );
            break;
        }

        if timestamp < previous_timestamp {
            return Err(ReadError::TimestampRegression {
                source_name: source_name.to_string(),
                line: line_of(&record),
                previous: previous_timestamp,
                found: timestamp,
            });
        }
        previous_timestamp = timestamp;

        let x: i32 = parse_column(&record, X_COLUMN, source_name)?;
        let raw_y: i32 = parse_column(&record, Y_COLUMN, source_name)?;
        let y = flip_y(raw_y).ok_or_else(|| ReadError::MalformedRow {
            source_name: source_name.to_string(),
            line: line_of(&record),
            column: Y_COLUMN,
            value: raw_y.to_string(),
        })?;
        let polarity = truthy.is_on(record.get(POLARITY_COLUMN).unwrap_or_default());

        data.push(polarity, x, y, normalized);
    }

    info!("{source_name}: read {} events", data.len());
    Ok(data)
}
