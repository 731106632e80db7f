use chrono::Timelike;
use tracing::{debug, info};

use metgrid_parser::ChannelValue;

use crate::error::{PipelineError, Result};
use crate::grid::GriddedSeries;
use crate::table::{ObservationRow, ObservationTable, TablePurpose};

const MILLIS_PER_SECOND: i64 = 1000;

/// The record's own seconds counter carries nothing once rows are one second apart.
pub const DECIMATION_DROPPED_COLUMNS: [&str; 1] = ["sec"];

/// Every tower channel on every grid slot.
pub fn tower_20hz_table(series: &GriddedSeries) -> ObservationTable {
    let width = series.row_width();
    let rows = series
        .slots()
        .map(|(timestamp, slot)| ObservationRow {
            timestamp,
            height: None,
            values: slot
                .map(<[ChannelValue]>::to_vec)
                .unwrap_or_else(|| vec![ChannelValue::Missing; width]),
        })
        .collect();

    ObservationTable {
        purpose: TablePurpose::Tower20Hz,
        columns: series.layout.fixed.clone(),
        keyed_by_height: false,
        rows,
    }
}

/// Keeps the named columns of `table`, in the order given.
pub fn project_columns(
    table: &ObservationTable,
    purpose: TablePurpose,
    names: &[&str],
) -> Result<ObservationTable> {
    let indices = names
        .iter()
        .map(|name| {
            table.column_index(name).ok_or_else(|| {
                PipelineError::Validation(format!(
                    "column '{name}' is not part of the {} table",
                    table.purpose.suffix()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = table
        .rows
        .iter()
        .map(|row| ObservationRow {
            timestamp: row.timestamp,
            height: row.height,
            values: indices
                .iter()
                .map(|index| row.values[*index].clone())
                .collect(),
        })
        .collect();

    Ok(ObservationTable {
        purpose,
        columns: indices
            .iter()
            .map(|index| table.columns[*index].clone())
            .collect(),
        keyed_by_height: table.keyed_by_height,
        rows,
    })
}

/// Keeps one observed slot per second: the one `phase_ms` milliseconds past the second. Seconds
/// whose phase slot was not observed are absent from the result.
pub fn decimate_to_1hz(
    series: &GriddedSeries,
    phase_ms: i64,
    dropped_columns: &[&str],
) -> Result<ObservationTable> {
    let period_ms = series.grid.period_ms();
    if MILLIS_PER_SECOND % period_ms != 0 {
        return Err(PipelineError::Config(format!(
            "a {period_ms} ms grid cannot be decimated to whole seconds"
        )));
    }
    if !(0..MILLIS_PER_SECOND).contains(&phase_ms) || phase_ms % period_ms != 0 {
        return Err(PipelineError::Config(format!(
            "phase offset {phase_ms} ms must be a multiple of {period_ms} below {MILLIS_PER_SECOND}"
        )));
    }

    let kept: Vec<usize> = series
        .layout
        .fixed
        .iter()
        .enumerate()
        .filter(|(_, column)| !dropped_columns.contains(&column.name.as_str()))
        .map(|(index, _)| index)
        .collect();

    let start_offset_ms = i64::from(series.grid.start().nanosecond() / 1_000_000);
    let mut rows = Vec::with_capacity(series.len() / (MILLIS_PER_SECOND / period_ms) as usize + 1);
    let mut gaps = 0usize;

    for (index, (timestamp, slot)) in series.slots().enumerate() {
        let offset_ms = (start_offset_ms + index as i64 * period_ms) % MILLIS_PER_SECOND;
        if offset_ms != phase_ms {
            continue;
        }
        match slot {
            Some(values) => rows.push(ObservationRow {
                timestamp,
                height: None,
                values: kept.iter().map(|index| values[*index].clone()).collect(),
            }),
            None => gaps += 1,
        }
    }

    if gaps > 0 {
        debug!(seconds = gaps, phase_ms, "seconds without a phase sample");
    }
    info!(rows = rows.len(), phase_ms, "decimated tower series to 1 Hz");

    Ok(ObservationTable {
        purpose: TablePurpose::Tower1Hz,
        columns: kept
            .iter()
            .map(|index| series.layout.fixed[*index].clone())
            .collect(),
        keyed_by_height: false,
        rows,
    })
}
