//! Error types for AEDAT CSV ingestion.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Found header: {found:?}\nExpected: {expected}")]
    Format { found: Vec<String>, expected: String },

    #[error("CSV file '{source_name}' seems to be empty")]
    EmptyData { source_name: String },

    #[error("CSV file could not be found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("{source_name}:{line}: column {column} is not a valid integer or is out of range: {value:?}")]
    MalformedRow {
        source_name: String,
        line: u64,
        column: usize,
        value: String,
    },

    #[error("{source_name}:{line}: glitched row has no accepted rows to average")]
    GlitchWithoutHistory { source_name: String, line: u64 },

    #[error("{source_name}:{line}: timestamp {found} is earlier than previous timestamp {previous}")]
    TimestampRegression {
        source_name: String,
        line: u64,
        previous: i64,
        found: i64,
    },

    #[error("{source_name}:{line}: timestamp {found} is too far from the first timestamp {first}")]
    TimestampOutOfRange {
        source_name: String,
        line: u64,
        first: i64,
        found: i64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReadError>;
