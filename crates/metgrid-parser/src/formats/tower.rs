use tracing::{debug, info};

use crate::classify::classify_records;
use crate::errors::ParserError;
use crate::model::{InstrumentKind, ObservedRow, ParsedSeries, RawRecord};
use crate::registry::InstrumentParser;
use crate::timestamp::{parse_tower_timestamp, series_bounds};

use super::common::{parse_channel_at, split_csv_fields};
use super::layout::{TOWER_FIELD_COUNT, TOWER_LAYOUT, TOWER_TIMESTAMP_FIELDS};

/// Parses the Campbell 20 Hz tower export: comma-separated lines with a record index, year,
/// day-of-year, `HHMM` and fractional seconds ahead of the sonic and probe channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TowerParser;

impl TowerParser {
    pub const NAME: &'static str = "CAMPBELL_20HZ";

    fn parse_row(record: &RawRecord) -> Result<ObservedRow, ParserError> {
        let fields = split_csv_fields(Self::NAME, record)?;
        let position = record.position;

        if fields.len() < TOWER_TIMESTAMP_FIELDS {
            return Err(ParserError::MalformedTimestamp {
                parser: Self::NAME,
                position,
                message: format!(
                    "expected {TOWER_TIMESTAMP_FIELDS} timestamp fields, found {}",
                    fields.len()
                ),
            });
        }
        if fields.len() > TOWER_FIELD_COUNT {
            return Err(ParserError::DataRow {
                parser: Self::NAME,
                position,
                message: format!(
                    "expected at most {TOWER_FIELD_COUNT} fields, found {}",
                    fields.len()
                ),
            });
        }
        if fields.len() < TOWER_FIELD_COUNT {
            debug!(%position, fields = fields.len(), "short tower row; trailing channels missing");
        }

        let timestamp = parse_tower_timestamp(
            Self::NAME,
            &fields[1],
            &fields[2],
            &fields[3],
            &fields[4],
            position,
        )?;

        let values = TOWER_LAYOUT
            .fixed
            .iter()
            .map(|channel| parse_channel_at(Self::NAME, channel, &fields, 0, position))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ObservedRow {
            position,
            timestamp,
            values,
        })
    }
}

impl InstrumentParser for TowerParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn instrument(&self) -> InstrumentKind {
        InstrumentKind::Tower
    }

    fn parse(&self, records: &[RawRecord]) -> Result<ParsedSeries, ParserError> {
        TOWER_LAYOUT.validate(Self::NAME, TOWER_FIELD_COUNT, 0)?;

        let classified = classify_records(Self::NAME, InstrumentKind::Tower, records)?;
        info!(
            data_rows = classified.data_rows.len(),
            "classified tower records"
        );

        let rows = classified
            .data_rows
            .iter()
            .map(|record| Self::parse_row(record))
            .collect::<Result<Vec<_>, _>>()?;

        let bounds = series_bounds(&rows).ok_or(ParserError::EmptyInput {
            parser: Self::NAME,
            records: records.len(),
        })?;

        Ok(ParsedSeries {
            parser: Self::NAME,
            instrument: InstrumentKind::Tower,
            layout: TOWER_LAYOUT.column_layout(),
            heights: Vec::new(),
            rows,
            bounds,
        })
    }
}
