// THEORY:
// The `reader` module is the top-level API of the crate. It wraps the core
// ingestion passes with file handling: each call opens its own file, runs one
// pass, and lets the handle drop on every exit path, including validation
// failures. A missing file is reported as `NotFound` rather than a bare I/O error.
//
// `EventLogReader` bundles an `AnalysisConfig` so a caller that reads many files
// with the same settings only has to build the configuration once.

use crate::core_modules::activity::analyze_activity;
use crate::core_modules::chunk::ingest_chunks;
use crate::core_modules::spatial::ingest_spatial;
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// Re-export key data structures for the public API.
pub use crate::core_modules::activity::PixelActivity;
pub use crate::core_modules::chunk::{ChunkCsvData, GLITCH_THRESHOLD};
pub use crate::core_modules::config::{
    ActivityWatch, AnalysisConfig, ChunkConfig, PolarityStorage, SpatialConfig,
};
pub use crate::core_modules::decomposition::{
    CountColumn, DecompositionModel, DecompositionRequest, NamedSeries, prepare_series,
};
pub use crate::core_modules::error::{ReadError, Result};
pub use crate::core_modules::record::{ChunkRecord, FRAME_HEIGHT, PolarityColor, SpatialEvent};
pub use crate::core_modules::spatial::{SpatialCsvData, TruthyToken};

fn open(path: &Path) -> Result<BufReader<File>> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ReadError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(ReadError::Io(e)),
    }
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}

/// Reads a per-event export from a file.
pub fn ingest_spatial_file<P: AsRef<Path>>(path: P, config: &SpatialConfig) -> Result<SpatialCsvData> {
    let path = path.as_ref();
    debug!("opening spatial log {}", path.display());
    ingest_spatial(open(path)?, &source_name(path), config)
}

/// Reads a per-window count export from a file.
pub fn ingest_chunks_file<P: AsRef<Path>>(path: P, config: &ChunkConfig) -> Result<ChunkCsvData> {
    let path = path.as_ref();
    debug!("opening chunk log {}", path.display());
    ingest_chunks(open(path)?, &source_name(path), config)
}

/// Runs pixel-area activity analysis over a per-event export file.
pub fn analyze_activity_file<P: AsRef<Path>>(path: P, watch: &ActivityWatch) -> Result<PixelActivity> {
    let path = path.as_ref();
    debug!("opening spatial log {} for activity", path.display());
    analyze_activity(open(path)?, &source_name(path), watch)
}

/// Reads files with one shared, validated configuration.
#[derive(Debug, Clone)]
pub struct EventLogReader {
    config: AnalysisConfig,
}

impl EventLogReader {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn read_spatial<P: AsRef<Path>>(&self, path: P) -> Result<SpatialCsvData> {
        ingest_spatial_file(path, &self.config.spatial)
    }

    pub fn read_chunks<P: AsRef<Path>>(&self, path: P) -> Result<ChunkCsvData> {
        ingest_chunks_file(path, &self.config.chunks)
    }

    /// Fails with `InvalidConfig` when the configuration has no activity section.
    pub fn read_activity<P: AsRef<Path>>(&self, path: P) -> Result<PixelActivity> {
        let watch = self.config.activity.as_ref().ok_or_else(|| {
            ReadError::InvalidConfig("no activity section configured".to_string())
        })?;
        analyze_activity_file(path, watch)
    }
}
