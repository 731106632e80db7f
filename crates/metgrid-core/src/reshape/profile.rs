use std::ops::Range;

use tracing::debug;

use metgrid_parser::{ChannelValue, HeightLevel};

use crate::grid::GriddedSeries;
use crate::table::{ObservationRow, ObservationTable, TablePurpose};

/// Fixed profiler channels, one row per grid slot.
pub fn pth_table(series: &GriddedSeries) -> ObservationTable {
    let width = series.layout.fixed.len();
    let rows = series
        .slots()
        .map(|(timestamp, slot)| ObservationRow {
            timestamp,
            height: None,
            values: match slot {
                Some(values) => values[..width].to_vec(),
                None => vec![ChannelValue::Missing; width],
            },
        })
        .collect();

    ObservationTable {
        purpose: TablePurpose::Pth,
        columns: series.layout.fixed.clone(),
        keyed_by_height: false,
        rows,
    }
}

/// One row per grid slot and declared height, heights in declaration order.
pub fn height_profile_table(series: &GriddedSeries) -> ObservationTable {
    let blocks: Vec<(HeightLevel, Range<usize>)> = series
        .heights
        .iter()
        .enumerate()
        .map(|(index, height)| (*height, series.layout.block_range(index)))
        .collect();
    let block_width = series.layout.block.len();

    let mut rows = Vec::with_capacity(series.len() * blocks.len());
    for (timestamp, slot) in series.slots() {
        for (height, range) in &blocks {
            let values = match slot {
                Some(values) => values[range.clone()].to_vec(),
                None => vec![ChannelValue::Missing; block_width],
            };
            rows.push(ObservationRow {
                timestamp,
                height: Some(*height),
                values,
            });
        }
    }

    debug!(
        slots = series.len(),
        heights = blocks.len(),
        rows = rows.len(),
        "split profiler rows by height"
    );

    ObservationTable {
        purpose: TablePurpose::Profile,
        columns: series.layout.block.clone(),
        keyed_by_height: true,
        rows,
    }
}
