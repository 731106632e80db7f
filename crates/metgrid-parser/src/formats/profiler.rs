use tracing::{debug, info, warn};

use crate::classify::{classify_records, HEIGHT_DECLARATION_MARKER};
use crate::errors::ParserError;
use crate::model::{
    ChannelValue, HeightLevel, InstrumentKind, ObservedRow, ParsedSeries, RawRecord, RecordPosition,
};
use crate::registry::InstrumentParser;
use crate::timestamp::{parse_profiler_timestamp, series_bounds};

use super::common::{parse_channel_at, split_tab_fields};
use super::layout::PROFILER_LAYOUT;

/// Parses scanning wind profiler `.sta` dumps: one tab-separated line per 10 minute scan, PTH
/// fields followed by one twelve-field block per declared height.
#[derive(Debug, Clone, Copy)]
pub struct ProfilerParser {
    /// Fail without a height declaration. When false such input yields a PTH-only series.
    pub require_heights: bool,
    /// Fail when files declare different height sets instead of keeping the first declaration.
    pub require_consistent_heights: bool,
}

impl Default for ProfilerParser {
    fn default() -> Self {
        Self {
            require_heights: true,
            require_consistent_heights: true,
        }
    }
}

impl ProfilerParser {
    pub const NAME: &'static str = "WINDCUBE_STA";

    fn parse_height_declaration(record: &RawRecord) -> Result<Vec<HeightLevel>, ParserError> {
        split_tab_fields(&record.text)
            .into_iter()
            .skip(1)
            .filter(|token| !token.trim().is_empty())
            .enumerate()
            .map(|(idx, token)| {
                HeightLevel::try_from(token).map_err(|_| ParserError::InvalidChannelValue {
                    parser: Self::NAME,
                    field: format!("{HEIGHT_DECLARATION_MARKER}[{idx}]"),
                    value: token.trim().to_string(),
                    position: record.position,
                })
            })
            .collect()
    }

    /// Resolves the single height set of the run from every declaration row.
    fn declared_heights(
        &self,
        metadata_rows: &[&RawRecord],
    ) -> Result<Vec<HeightLevel>, ParserError> {
        let mut declared: Option<(RecordPosition, Vec<HeightLevel>)> = None;

        for record in metadata_rows {
            let heights = Self::parse_height_declaration(record)?;
            match &declared {
                None => {
                    debug!(position = %record.position, count = heights.len(), "height declaration");
                    declared = Some((record.position, heights));
                }
                Some((first_position, expected)) if *expected != heights => {
                    if self.require_consistent_heights {
                        return Err(ParserError::InconsistentHeightSet {
                            parser: Self::NAME,
                            position: record.position,
                            expected: expected.clone(),
                            found: heights,
                        });
                    }
                    warn!(
                        first = %first_position,
                        diverging = %record.position,
                        "height declarations differ; keeping the first"
                    );
                }
                Some(_) => {}
            }
        }

        match declared {
            Some((_, heights)) => Ok(heights),
            None if self.require_heights => Err(ParserError::MissingHeightDeclaration {
                parser: Self::NAME,
            }),
            None => Ok(Vec::new()),
        }
    }

    fn parse_row(
        record: &RawRecord,
        height_count: usize,
        row_width: usize,
    ) -> Result<ObservedRow, ParserError> {
        let fields = split_tab_fields(&record.text);
        let position = record.position;

        let timestamp_field = fields.first().copied().unwrap_or_default();
        let timestamp = parse_profiler_timestamp(Self::NAME, timestamp_field, position)?;

        let mut values = Vec::with_capacity(row_width);
        for channel in PROFILER_LAYOUT.fixed {
            values.push(parse_channel_at(Self::NAME, channel, &fields, 0, position)?);
        }

        let block_channels = PROFILER_LAYOUT
            .block
            .map(|block| block.channels)
            .unwrap_or_default();
        for block_index in 0..height_count {
            // A block cut short by the end of the line is dropped whole.
            if fields.len() < PROFILER_LAYOUT.block_required_fields(block_index) {
                values.resize(values.len() + block_channels.len(), ChannelValue::Missing);
                continue;
            }
            let base = PROFILER_LAYOUT.block_start(block_index);
            for channel in block_channels {
                values.push(parse_channel_at(Self::NAME, channel, &fields, base, position)?);
            }
        }

        Ok(ObservedRow {
            position,
            timestamp,
            values,
        })
    }
}

impl InstrumentParser for ProfilerParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn instrument(&self) -> InstrumentKind {
        InstrumentKind::Profiler
    }

    fn parse(&self, records: &[RawRecord]) -> Result<ParsedSeries, ParserError> {
        let classified = classify_records(Self::NAME, InstrumentKind::Profiler, records)?;
        info!(
            data_rows = classified.data_rows.len(),
            metadata_rows = classified.metadata_rows.len(),
            "classified profiler records"
        );

        let heights = self.declared_heights(&classified.metadata_rows)?;
        // Line width follows from the declared heights, so only the offsets can be checked.
        PROFILER_LAYOUT.validate_descriptors(Self::NAME)?;

        let layout = PROFILER_LAYOUT.column_layout();
        let row_width = layout.width(heights.len());

        let rows = classified
            .data_rows
            .iter()
            .map(|record| Self::parse_row(record, heights.len(), row_width))
            .collect::<Result<Vec<_>, _>>()?;

        let bounds = series_bounds(&rows).ok_or(ParserError::EmptyInput {
            parser: Self::NAME,
            records: records.len(),
        })?;

        Ok(ParsedSeries {
            parser: Self::NAME,
            instrument: InstrumentKind::Profiler,
            layout,
            heights,
            rows,
            bounds,
        })
    }
}
