// THEORY:
// The two export formats are told apart purely by their header row. The spatial
// export has a fixed four-column schema that must match literally. The chunk export
// is looser: any header works as long as every column announces that it holds a
// count. Both checks run before a single data row is read.

use crate::core_modules::error::{ReadError, Result};
use csv::StringRecord;
use std::str::FromStr;

/// The literal header of a per-event export.
pub const SPATIAL_HEADER: [&str; 4] = ["On/Off", "X", "Y", "Timestamp"];

/// Column indices of the per-event export.
pub const POLARITY_COLUMN: usize = 0;
pub const X_COLUMN: usize = 1;
pub const Y_COLUMN: usize = 2;
pub const TIMESTAMP_COLUMN: usize = 3;

/// Substring every chunk-export header field must contain, compared case-insensitively.
pub const COUNT_MARKER: &str = "count";

fn found_fields(header: &StringRecord) -> Vec<String> {
    header.iter().map(str::to_string).collect()
}

/// Fails unless `header` is exactly `On/Off,X,Y,Timestamp`.
pub fn check_spatial_header(header: &StringRecord) -> Result<()> {
    if header.iter().eq(SPATIAL_HEADER.iter().copied()) {
        return Ok(());
    }
    Err(ReadError::Format {
        found: found_fields(header),
        expected: format!("{:?}", SPATIAL_HEADER),
    })
}

/// Fails unless `header` is non-empty and every field mentions a count.
pub fn check_count_header(header: &StringRecord) -> Result<()> {
    let is_blank = header.is_empty() || (header.len() == 1 && header[0].is_empty());
    let all_counts = header
        .iter()
        .all(|field| field.to_lowercase().contains(COUNT_MARKER));
    if !is_blank && all_counts {
        return Ok(());
    }
    Err(ReadError::Format {
        found: found_fields(header),
        expected: "header entries indicating that the columns contain event counts".to_string(),
    })
}

/// The 1-based line a record started on, or 0 if the reader did not track it.
pub(crate) fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Parses one column of a data row. A missing column and an unparsable value
/// are both reported as a malformed row.
pub(crate) fn parse_column<T: FromStr>(
    record: &StringRecord,
    column: usize,
    source_name: &str,
) -> Result<T> {
    let raw = record.get(column);
    raw.and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| ReadError::MalformedRow {
            source_name: source_name.to_string(),
            line: line_of(record),
            column,
            value: raw.unwrap_or("<missing>").to_string(),
        })
}
