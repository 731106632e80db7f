use anyhow::Result;
use chrono::{NaiveDateTime, TimeDelta};
use metgrid_core::grid::{
    nominal_period, place_on_grid, reindex, GridError, TimeGrid, PROFILER_PERIOD_MS,
};
use metgrid_parser::{
    ChannelValue, InstrumentKind, ObservedRow, ParsedSeries, RecordPosition, SeriesBounds,
};

fn ts(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").expect("valid timestamp")
}

fn row(timestamp: &str, line: usize, value: f64) -> ObservedRow {
    ObservedRow {
        position: RecordPosition::new(0, line),
        timestamp: ts(timestamp),
        values: vec![ChannelValue::Number(value)],
    }
}

fn single_channel_series(rows: Vec<ObservedRow>) -> ParsedSeries {
    use metgrid_parser::{ChannelKind, ColumnLayout, ColumnSpec};

    let bounds = SeriesBounds {
        start: rows.first().expect("rows").timestamp,
        end: rows.last().expect("rows").timestamp,
    };
    ParsedSeries {
        parser: "test",
        instrument: InstrumentKind::Profiler,
        layout: ColumnLayout {
            fixed: vec![ColumnSpec::new("value", ChannelKind::Numeric)],
            block: Vec::new(),
        },
        heights: Vec::new(),
        rows,
        bounds,
    }
}

#[test]
fn grid_length_matches_span_over_period() -> Result<()> {
    let grid = TimeGrid::new(
        ts("2021-09-14 00:00:00"),
        ts("2021-09-14 00:30:00"),
        nominal_period(InstrumentKind::Profiler),
    )?;
    assert_eq!(grid.len(), 4);
    assert_eq!(grid.end(), ts("2021-09-14 00:30:00"));

    let points: Vec<_> = grid.iter().collect();
    for pair in points.windows(2) {
        assert_eq!(pair[1] - pair[0], TimeDelta::milliseconds(PROFILER_PERIOD_MS));
    }

    let tower = TimeGrid::new(
        ts("2022-03-21 00:05:00.000"),
        ts("2022-03-21 00:05:02.000"),
        nominal_period(InstrumentKind::Tower),
    )?;
    assert_eq!(tower.len(), 41);
    assert_eq!(tower.get(1), Some(ts("2022-03-21 00:05:00.050")));
    assert_eq!(tower.get(41), None);
    Ok(())
}

#[test]
fn single_instant_grid_has_one_slot() -> Result<()> {
    let instant = ts("2021-09-14 00:00:00");
    let grid = TimeGrid::new(instant, instant, nominal_period(InstrumentKind::Profiler))?;
    assert_eq!(grid.len(), 1);
    assert_eq!(grid.index_of(instant), Some(0));
    Ok(())
}

#[test]
fn end_off_the_period_is_irregular() {
    let err = TimeGrid::new(
        ts("2021-09-14 00:00:00"),
        ts("2021-09-14 00:25:00"),
        nominal_period(InstrumentKind::Profiler),
    )
    .unwrap_err();
    assert!(matches!(err, GridError::IrregularBounds { period_ms, .. } if period_ms == PROFILER_PERIOD_MS));

    let reversed = TimeGrid::new(
        ts("2021-09-14 00:30:00"),
        ts("2021-09-14 00:00:00"),
        nominal_period(InstrumentKind::Profiler),
    );
    assert!(matches!(reversed, Err(GridError::IrregularBounds { .. })));
}

#[test]
fn index_of_rejects_instants_between_slots() -> Result<()> {
    let grid = TimeGrid::new(
        ts("2021-09-14 00:00:00"),
        ts("2021-09-14 00:30:00"),
        nominal_period(InstrumentKind::Profiler),
    )?;
    assert_eq!(grid.index_of(ts("2021-09-14 00:20:00")), Some(2));
    assert_eq!(grid.index_of(ts("2021-09-14 00:15:00")), None);
    assert_eq!(grid.index_of(ts("2021-09-13 23:50:00")), None);
    assert_eq!(grid.index_of(ts("2021-09-14 00:40:00")), None);
    Ok(())
}

#[test]
fn gap_becomes_an_empty_slot() -> Result<()> {
    let series = single_channel_series(vec![
        row("2021-09-14 00:00:00", 0, 1.0),
        row("2021-09-14 00:20:00", 1, 3.0),
        row("2021-09-14 00:30:00", 2, 4.0),
    ]);

    let (gridded, report) = reindex(series, nominal_period(InstrumentKind::Profiler))?;
    assert_eq!(gridded.len(), 4);
    assert_eq!(gridded.slot(1), None);
    assert_eq!(gridded.slot(2), Some(&[ChannelValue::Number(3.0)][..]));
    assert_eq!(report.filled_slots, 3);
    assert_eq!(report.missing_slots(), 1);
    assert_eq!(gridded.missing_count(), 1);
    Ok(())
}

#[test]
fn later_duplicate_overwrites_earlier() -> Result<()> {
    let series = single_channel_series(vec![
        row("2021-09-14 00:00:00", 0, 1.0),
        row("2021-09-14 00:10:00", 1, 2.0),
        row("2021-09-14 00:10:00", 2, 20.0),
        row("2021-09-14 00:20:00", 3, 3.0),
    ]);

    let (gridded, report) = reindex(series, nominal_period(InstrumentKind::Profiler))?;
    assert_eq!(gridded.slot(1), Some(&[ChannelValue::Number(20.0)][..]));
    assert_eq!(report.duplicates_overwritten, 1);
    assert_eq!(report.filled_slots, 3);
    Ok(())
}

#[test]
fn off_grid_rows_are_counted_not_placed() -> Result<()> {
    let grid = TimeGrid::new(
        ts("2021-09-14 00:00:00"),
        ts("2021-09-14 00:20:00"),
        nominal_period(InstrumentKind::Profiler),
    )?;
    let rows = vec![
        (ts("2021-09-14 00:00:00"), vec![ChannelValue::Number(1.0)]),
        (ts("2021-09-14 00:05:00"), vec![ChannelValue::Number(9.0)]),
        (ts("2021-09-14 01:00:00"), vec![ChannelValue::Number(9.0)]),
        (ts("2021-09-14 00:20:00"), vec![ChannelValue::Number(3.0)]),
    ];

    let (slots, report) = place_on_grid(&grid, rows);
    assert_eq!(slots.len(), 3);
    assert_eq!(report.observed_rows, 4);
    assert_eq!(report.off_grid_rows, 2);
    assert_eq!(report.filled_slots, 2);
    assert!(slots[1].is_none());
    Ok(())
}

#[test]
fn reindexing_a_gridded_series_is_idempotent() -> Result<()> {
    let series = single_channel_series(vec![
        row("2021-09-14 00:00:00", 0, 1.0),
        row("2021-09-14 00:30:00", 1, 4.0),
        row("2021-09-14 00:50:00", 2, 6.0),
    ]);

    let (gridded, _) = reindex(series, nominal_period(InstrumentKind::Profiler))?;
    let again = gridded.reindexed();
    assert_eq!(again, gridded);
    assert_eq!(again.reindexed(), gridded);
    Ok(())
}

#[test]
fn every_slot_timestamp_lies_on_the_grid() -> Result<()> {
    let series = single_channel_series(vec![
        row("2021-09-14 00:00:00", 0, 1.0),
        row("2021-09-14 01:00:00", 1, 7.0),
    ]);
    let (gridded, _) = reindex(series, nominal_period(InstrumentKind::Profiler))?;

    let start = gridded.grid.start();
    let end = gridded.grid.end();
    for (index, (timestamp, _)) in gridded.slots().enumerate() {
        assert_eq!(gridded.grid.index_of(timestamp), Some(index));
        assert!(timestamp >= start && timestamp <= end);
    }
    Ok(())
}
