// THEORY:
// The `record` module holds the two row shapes produced by ingestion. Both are
// "dumb" data containers: they know how to describe themselves but not how they
// were parsed or what they will be used for.
//
// Ingested collections store their data column-wise (parallel vectors) because
// that is what the downstream plotting and statistics collaborators consume. These
// row types are the row-wise view over those columns, handed out by the
// collections' iterators for code that wants one event or one window at a time.

/// Height of the sensor frame in pixels. Raw Y coordinates are flipped against it.
pub const FRAME_HEIGHT: i32 = 128;

/// Categorical color tag for a polarity, as consumed by scatter-style plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolarityColor {
    /// An "on" event (brightness increase).
    Green,
    /// An "off" event (brightness decrease).
    Red,
}

impl PolarityColor {
    pub fn tag(self) -> &'static str {
        match self {
            PolarityColor::Green => "g",
            PolarityColor::Red => "r",
        }
    }
}

impl From<bool> for PolarityColor {
    fn from(polarity: bool) -> Self {
        if polarity {
            PolarityColor::Green
        } else {
            PolarityColor::Red
        }
    }
}

/// A single pixel event after coordinate remapping and timestamp normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialEvent {
    /// The polarity, if the collection was built with a polarity representation.
    pub polarity: Option<bool>,
    /// The pixel column.
    pub x: i32,
    /// The flipped pixel row (`FRAME_HEIGHT - y_raw`).
    pub y: i32,
    /// Microseconds since the first retained event.
    pub timestamp: i64,
}

/// Event counts for one fixed time window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkRecord {
    /// Start of the window in seconds, relative to the first window.
    pub time_offset: f64,
    pub on_count: u64,
    pub off_count: u64,
    pub all_count: u64,
}

/// Flips a raw sensor row so the origin sits at the bottom of the frame.
/// `None` when the flipped row does not fit in an `i32`.
#[inline]
pub fn flip_y(raw_y: i32) -> Option<i32> {
    FRAME_HEIGHT.checked_sub(raw_y)
}
