// THEORY:
// Seasonal decomposition itself is done by an external statistics library. This
// module only prepares what that library is handed: one named numeric series, the
// seasonal period, and the model.
//
// The multiplicative model divides by the series, so an exact zero anywhere would
// poison the whole decomposition. Zeros are replaced by a small positive value
// before hand-off. The additive model receives the counts unchanged.

use crate::core_modules::chunk::ChunkCsvData;
use crate::core_modules::error::{ReadError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stand-in for zero counts under the multiplicative model.
pub const MULTIPLICATIVE_ZERO_SUBSTITUTE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionModel {
    Additive,
    Multiplicative,
}

impl DecompositionModel {
    pub fn as_str(self) -> &'static str {
        match self {
            DecompositionModel::Additive => "additive",
            DecompositionModel::Multiplicative => "multiplicative",
        }
    }
}

/// Which count sequence of a chunk export to decompose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountColumn {
    On,
    Off,
    Combined,
}

impl CountColumn {
    pub fn label(self) -> &'static str {
        match self {
            CountColumn::On => "On Count",
            CountColumn::Off => "Off Count",
            CountColumn::Combined => "All Count",
        }
    }

    fn select(self, data: &ChunkCsvData) -> &[u64] {
        match self {
            CountColumn::On => data.on_counts(),
            CountColumn::Off => data.off_counts(),
            CountColumn::Combined => data.all_counts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionRequest {
    pub column: CountColumn,
    pub model: DecompositionModel,
    /// Seasonal period, in windows.
    pub period: usize,
    /// Windows dropped from the start of the series.
    #[serde(default)]
    pub skip_rows: usize,
    /// Windows handed to the decomposition after skipping.
    pub num_rows: usize,
    /// Prefix of the series name. Defaults to the source's file stem.
    #[serde(default)]
    pub title: Option<String>,
}

impl DecompositionRequest {
    pub fn new(column: CountColumn, model: DecompositionModel, num_rows: usize) -> Self {
        Self {
            column,
            model,
            period: 100,
            skip_rows: 0,
            num_rows,
            title: None,
        }
    }
}

/// The series handed to the decomposition collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub period: usize,
    pub model: DecompositionModel,
    pub values: Vec<f64>,
}

/// File stem of a source name, used as the default series title.
pub fn default_title(source_name: &str) -> String {
    Path::new(source_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string())
}

/// Slices and sanitizes one count sequence for decomposition.
pub fn prepare_series(data: &ChunkCsvData, request: &DecompositionRequest) -> Result<NamedSeries> {
    if request.period == 0 {
        return Err(ReadError::InvalidConfig("period must be greater than zero".to_string()));
    }
    if request.num_rows == 0 {
        return Err(ReadError::InvalidConfig("num_rows must be greater than zero".to_string()));
    }

    let counts = request.column.select(data);
    if request.skip_rows >= counts.len() {
        return Err(ReadError::EmptyData {
            source_name: data.source_name().to_string(),
        });
    }

    let values = counts
        .iter()
        .skip(request.skip_rows)
        .take(request.num_rows)
        .map(|&count| match (request.model, count) {
            (DecompositionModel::Multiplicative, 0) => MULTIPLICATIVE_ZERO_SUBSTITUTE,
            _ => count as f64,
        })
        .collect();

    let title = request
        .title
        .clone()
        .unwrap_or_else(|| default_title(data.source_name()));

    Ok(NamedSeries {
        name: format!("{title} {}", request.column.label()),
        period: request.period,
        model: request.model,
        values,
    })
}
