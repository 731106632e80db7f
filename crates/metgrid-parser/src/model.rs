use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Canonical absolute instant of one sample. Profiler rows carry second resolution, tower rows
/// millisecond resolution.
pub type Timestamp = NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    /// Scanning wind profiler writing `.sta` dumps every 10 minutes.
    Profiler,
    /// Micrometeorological tower logging at 20 Hz.
    Tower,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Profiler => "profiler",
            InstrumentKind::Tower => "tower",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a raw line came from: the file's position in the sorted input set and the zero-based
/// line number inside that file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RecordPosition {
    pub file_index: usize,
    pub line_index: usize,
}

impl RecordPosition {
    pub fn new(file_index: usize, line_index: usize) -> Self {
        Self {
            file_index,
            line_index,
        }
    }
}

impl fmt::Display for RecordPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file {} line {}", self.file_index, self.line_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub position: RecordPosition,
    pub text: String,
}

impl RawRecord {
    pub fn new(file_index: usize, line_index: usize, text: impl Into<String>) -> Self {
        Self {
            position: RecordPosition::new(file_index, line_index),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeightLevel(pub i64);

impl HeightLevel {
    pub fn meters(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for HeightLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for HeightLevel {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        trimmed
            .parse::<i64>()
            .map(HeightLevel)
            .map_err(|err| format!("invalid height level '{trimmed}': {err}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValue {
    Number(f64),
    Text(String),
    Missing,
}

impl ChannelValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, ChannelValue::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ChannelValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ChannelValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ChannelKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Describes how an [`ObservedRow`]'s value vector is laid out: `fixed` columns first, then one
/// run of `block` columns per declared height level, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnLayout {
    pub fixed: Vec<ColumnSpec>,
    pub block: Vec<ColumnSpec>,
}

impl ColumnLayout {
    pub fn width(&self, height_count: usize) -> usize {
        self.fixed.len() + self.block.len() * height_count
    }

    pub fn block_range(&self, block_index: usize) -> std::ops::Range<usize> {
        let start = self.fixed.len() + block_index * self.block.len();
        start..start + self.block.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservedRow {
    pub position: RecordPosition,
    pub timestamp: Timestamp,
    pub values: Vec<ChannelValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesBounds {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Every data row of one run with its canonical timestamp, ready for reindexing.
#[derive(Debug, Clone)]
pub struct ParsedSeries {
    pub parser: &'static str,
    pub instrument: InstrumentKind,
    pub layout: ColumnLayout,
    pub heights: Vec<HeightLevel>,
    pub rows: Vec<ObservedRow>,
    pub bounds: SeriesBounds,
}

impl ParsedSeries {
    pub fn row_width(&self) -> usize {
        self.layout.width(self.heights.len())
    }
}
