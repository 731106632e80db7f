use polars::prelude::{Column, DataFrame, DataType, NamedFrom, PolarsError, Series, TimeUnit};
use serde::Serialize;

use metgrid_parser::{ChannelKind, ChannelValue, ColumnSpec, HeightLevel, Timestamp};

pub const DATETIME_COLUMN: &str = "datetime";
pub const HEIGHT_COLUMN: &str = "height_m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TablePurpose {
    /// Profiler pressure, temperature and humidity channels, one row per scan.
    Pth,
    /// Profiler wind channels, one row per scan and height.
    Profile,
    /// Every tower channel at 20 Hz.
    Tower20Hz,
    /// Sonic anemometer temperature and wind components at 20 Hz.
    Sonic3d20Hz,
    /// Tower channels decimated to one row per second.
    Tower1Hz,
}

impl TablePurpose {
    pub fn suffix(&self) -> &'static str {
        match self {
            TablePurpose::Pth => "lidar_pth",
            TablePurpose::Profile => "lidar_profile",
            TablePurpose::Tower20Hz => "tower_20hz",
            TablePurpose::Sonic3d20Hz => "ane_sonic_3d_20hz",
            TablePurpose::Tower1Hz => "tower_1hz",
        }
    }

    /// Textual rendering of the datetime column; sub-second tables keep milliseconds.
    pub fn datetime_format(&self) -> &'static str {
        match self {
            TablePurpose::Pth | TablePurpose::Profile | TablePurpose::Tower1Hz => {
                "%Y-%m-%d %H:%M:%S"
            }
            TablePurpose::Tower20Hz | TablePurpose::Sonic3d20Hz => "%Y-%m-%d %H:%M:%S%.3f",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub timestamp: Timestamp,
    pub height: Option<HeightLevel>,
    pub values: Vec<ChannelValue>,
}

impl ObservationRow {
    pub fn is_all_missing(&self) -> bool {
        self.values.iter().all(ChannelValue::is_missing)
    }

    pub fn value(&self, index: usize) -> Option<&ChannelValue> {
        self.values.get(index)
    }
}

/// Terminal long-format table handed to output: rows ordered by timestamp, then by height in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    pub purpose: TablePurpose,
    pub columns: Vec<ColumnSpec>,
    pub keyed_by_height: bool,
    pub rows: Vec<ObservationRow>,
}

impl ObservationTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.rows.first().map(|row| row.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.rows.last().map(|row| row.timestamp)
    }

    /// Builds the output frame: `datetime`, then `height_m` for height-keyed tables, then one
    /// column per channel. Missing cells become nulls.
    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len() + 2);

        let millis: Vec<i64> = self
            .rows
            .iter()
            .map(|row| row.timestamp.and_utc().timestamp_millis())
            .collect();
        let datetime = Series::new(DATETIME_COLUMN.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        columns.push(datetime.into());

        if self.keyed_by_height {
            let heights: Vec<Option<i64>> = self
                .rows
                .iter()
                .map(|row| row.height.map(|height| height.meters()))
                .collect();
            columns.push(Series::new(HEIGHT_COLUMN.into(), heights).into());
        }

        for (index, spec) in self.columns.iter().enumerate() {
            let series = match spec.kind {
                ChannelKind::Numeric => {
                    let values: Vec<Option<f64>> = self
                        .rows
                        .iter()
                        .map(|row| row.value(index).and_then(ChannelValue::as_f64))
                        .collect();
                    Series::new(spec.name.as_str().into(), values)
                }
                ChannelKind::Text => {
                    let values: Vec<Option<&str>> = self
                        .rows
                        .iter()
                        .map(|row| row.value(index).and_then(ChannelValue::as_text))
                        .collect();
                    Series::new(spec.name.as_str().into(), values)
                }
            };
            columns.push(series.into());
        }

        DataFrame::new(columns)
    }
}
