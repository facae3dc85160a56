// THEORY:
// Every ingestion call is governed by an immutable configuration value that the
// caller builds once and passes in by reference. Nothing here is global, and
// nothing is copied reflectively from JSON: the JSON layout is the struct layout,
// unknown keys are rejected, and every knob has an explicit default.
//
// `validate` runs the range checks that the type system cannot express. The
// ingestion entry points call it before touching their source, so a bad
// configuration never produces a partial read.

use crate::core_modules::error::{ReadError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which polarity representations a spatial read keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolarityStorage {
    /// Keep polarity as a boolean per event.
    #[default]
    Bool,
    /// Keep polarity as a "g"/"r" color tag per event.
    Color,
    /// Keep both representations.
    BoolAndColor,
    /// Drop polarity entirely.
    None,
}

impl PolarityStorage {
    pub fn keeps_bool(self) -> bool {
        matches!(self, PolarityStorage::Bool | PolarityStorage::BoolAndColor)
    }

    pub fn keeps_color(self) -> bool {
        matches!(self, PolarityStorage::Color | PolarityStorage::BoolAndColor)
    }
}

/// Configuration for reading a per-event (`On/Off,X,Y,Timestamp`) log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpatialConfig {
    pub polarity_storage: PolarityStorage,
    /// Rows discarded right after the header. Recordings tend to be corrupted
    /// for a short while after the sensor starts.
    pub skip_rows: usize,
    /// Length of data to keep, in seconds from the first retained event.
    /// `None` reads to the end of the source.
    pub time_limit_secs: Option<f64>,
}

impl SpatialConfig {
    pub fn new(polarity_storage: PolarityStorage) -> Self {
        Self {
            polarity_storage,
            ..Self::default()
        }
    }

    /// The time limit in microseconds, truncated toward zero.
    pub fn time_limit_us(&self) -> Option<i64> {
        self.time_limit_secs.map(|secs| (secs * 1_000_000.0) as i64)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(secs) = self.time_limit_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ReadError::InvalidConfig(format!(
                    "time_limit_secs must be a non-negative number of seconds, got {secs}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for reading a per-window (`On Count,Off Count,All Count`) log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkConfig {
    /// Width of one reconstruction window, in microseconds.
    pub time_window_us: u64,
    /// Stop after this many rows have been accepted. `None` reads everything.
    pub max_rows: Option<usize>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            time_window_us: 500,
            max_rows: None,
        }
    }
}

impl ChunkConfig {
    pub fn new(time_window_us: u64) -> Self {
        Self {
            time_window_us,
            max_rows: None,
        }
    }

    /// Window width converted to seconds.
    pub fn time_window_secs(&self) -> f64 {
        self.time_window_us as f64 / 1_000_000.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_window_us == 0 {
            return Err(ReadError::InvalidConfig(
                "time_window_us must be greater than zero".to_string(),
            ));
        }
        if self.max_rows == Some(0) {
            return Err(ReadError::InvalidConfig(
                "max_rows must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// A square neighbourhood of sensor pixels whose state changes are observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityWatch {
    /// Column of the watched pixel, in raw sensor coordinates.
    pub pixel_x: i64,
    /// Row of the watched pixel, in raw sensor coordinates (not flipped).
    pub pixel_y: i64,
    /// Events closer than this on both axes count as the watched pixel.
    pub area_size: u32,
    /// Stop once this many state changes have been recorded.
    #[serde(default)]
    pub max_points: Option<usize>,
}

impl ActivityWatch {
    pub fn new(pixel_x: i64, pixel_y: i64, area_size: u32) -> Self {
        Self {
            pixel_x,
            pixel_y,
            area_size,
            max_points: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.area_size == 0 {
            return Err(ReadError::InvalidConfig(
                "area_size must be greater than zero".to_string(),
            ));
        }
        if self.max_points == Some(0) {
            return Err(ReadError::InvalidConfig(
                "max_points must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration file for an analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub spatial: SpatialConfig,
    pub chunks: ChunkConfig,
    pub activity: Option<ActivityWatch>,
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ReadError::Io(e),
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.spatial.validate()?;
        self.chunks.validate()?;
        if let Some(watch) = &self.activity {
            watch.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_yields_defaults() {
        let config = AnalysisConfig::from_json_str("{}").expect("defaults");
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.chunks.time_window_us, 500);
        assert_eq!(config.spatial.polarity_storage, PolarityStorage::Bool);
        assert!(config.spatial.time_limit_secs.is_none());
    }

    #[test]
    fn parses_nested_sections() {
        let json = r#"{
            "spatial": { "polarity_storage": "bool_and_color", "skip_rows": 10, "time_limit_secs": 2.5 },
            "chunks": { "time_window_us": 1000, "max_rows": 200 },
            "activity": { "pixel_x": 40, "pixel_y": 60, "area_size": 3 }
        }"#;
        let config = AnalysisConfig::from_json_str(json).expect("valid config");
        assert_eq!(config.spatial.polarity_storage, PolarityStorage::BoolAndColor);
        assert_eq!(config.spatial.skip_rows, 10);
        assert_eq!(config.spatial.time_limit_us(), Some(2_500_000));
        assert_eq!(config.chunks.max_rows, Some(200));
        let watch = config.activity.expect("activity section");
        assert_eq!((watch.pixel_x, watch.pixel_y, watch.area_size), (40, 60, 3));
        assert_eq!(watch.max_points, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AnalysisConfig::from_json_str(r#"{ "graphType": "hist" }"#).unwrap_err();
        assert!(matches!(err, ReadError::Json(_)));

        let err = AnalysisConfig::from_json_str(r#"{ "chunks": { "window": 5 } }"#).unwrap_err();
        assert!(matches!(err, ReadError::Json(_)));
    }

    #[test]
    fn range_checks() {
        let bad_window = r#"{ "chunks": { "time_window_us": 0 } }"#;
        assert!(matches!(
            AnalysisConfig::from_json_str(bad_window),
            Err(ReadError::InvalidConfig(_))
        ));

        let bad_rows = r#"{ "chunks": { "max_rows": 0 } }"#;
        assert!(matches!(
            AnalysisConfig::from_json_str(bad_rows),
            Err(ReadError::InvalidConfig(_))
        ));

        let bad_limit = r#"{ "spatial": { "time_limit_secs": -1.0 } }"#;
        assert!(matches!(
            AnalysisConfig::from_json_str(bad_limit),
            Err(ReadError::InvalidConfig(_))
        ));

        let bad_area = r#"{ "activity": { "pixel_x": 1, "pixel_y": 1, "area_size": 0 } }"#;
        assert!(matches!(
            AnalysisConfig::from_json_str(bad_area),
            Err(ReadError::InvalidConfig(_))
        ));
    }

    #[test]
    fn polarity_storage_flags() {
        assert!(PolarityStorage::Bool.keeps_bool());
        assert!(!PolarityStorage::Bool.keeps_color());
        assert!(PolarityStorage::Color.keeps_color());
        assert!(PolarityStorage::BoolAndColor.keeps_bool());
        assert!(PolarityStorage::BoolAndColor.keeps_color());
        assert!(!PolarityStorage::None.keeps_bool());
        assert!(!PolarityStorage::None.keeps_color());
    }

    #[test]
    fn time_limit_truncates_to_microseconds() {
        let config = SpatialConfig {
            time_limit_secs: Some(1.0000009),
            ..SpatialConfig::default()
        };
        assert_eq!(config.time_limit_us(), Some(1_000_000));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, r#"{{ "chunks": {{ "time_window_us": 250 }} }}"#).expect("write");
        drop(file);

        let config = AnalysisConfig::from_json_file(&path).expect("load");
        assert_eq!(config.chunks.time_window_us, 250);

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            AnalysisConfig::from_json_file(&missing),
            Err(ReadError::NotFound { .. })
        ));
    }
}
