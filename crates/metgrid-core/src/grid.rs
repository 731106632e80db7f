use chrono::TimeDelta;
use thiserror::Error;
use tracing::{info, warn};

use metgrid_parser::{
    ChannelValue, ColumnLayout, HeightLevel, InstrumentKind, ParsedSeries, SeriesBounds, Timestamp,
};

/// Scan cadence of the wind profiler.
pub const PROFILER_PERIOD_MS: i64 = 10 * 60 * 1000;
/// Sample spacing of the 20 Hz tower logger.
pub const TOWER_PERIOD_MS: i64 = 50;

pub fn nominal_period(instrument: InstrumentKind) -> TimeDelta {
    match instrument {
        InstrumentKind::Profiler => TimeDelta::milliseconds(PROFILER_PERIOD_MS),
        InstrumentKind::Tower => TimeDelta::milliseconds(TOWER_PERIOD_MS),
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("nominal period must be a positive whole number of milliseconds, got {period:?}")]
    InvalidPeriod { period: TimeDelta },
    #[error("series from {start} to {end} does not span a whole number of {period_ms} ms periods")]
    IrregularBounds {
        start: Timestamp,
        end: Timestamp,
        period_ms: i64,
    },
}

/// Regular sequence of instants `start + k * period` for `k` in `0..len`. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGrid {
    start: Timestamp,
    period_ms: i64,
    len: usize,
}

impl TimeGrid {
    pub fn new(start: Timestamp, end: Timestamp, period: TimeDelta) -> Result<Self, GridError> {
        let period_ms = exact_millis(period)
            .filter(|ms| *ms > 0)
            .ok_or(GridError::InvalidPeriod { period })?;

        let irregular = GridError::IrregularBounds {
            start,
            end,
            period_ms,
        };
        let span_ms = exact_millis(end - start).ok_or(irregular.clone())?;
        if span_ms < 0 || span_ms % period_ms != 0 {
            return Err(irregular);
        }

        let len = usize::try_from(span_ms / period_ms + 1).map_err(|_| irregular)?;
        Ok(Self {
            start,
            period_ms,
            len,
        })
    }

    pub fn from_bounds(bounds: SeriesBounds, period: TimeDelta) -> Result<Self, GridError> {
        Self::new(bounds.start, bounds.end, period)
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.start + TimeDelta::milliseconds(self.period_ms * (self.len as i64 - 1))
    }

    pub fn period(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.period_ms)
    }

    pub fn period_ms(&self) -> i64 {
        self.period_ms
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<Timestamp> {
        (index < self.len)
            .then(|| self.start + TimeDelta::milliseconds(self.period_ms * index as i64))
    }

    /// Slot holding exactly `timestamp`, or `None` when it falls between or outside the slots.
    pub fn index_of(&self, timestamp: Timestamp) -> Option<usize> {
        let offset_ms = exact_millis(timestamp - self.start)?;
        if offset_ms < 0 || offset_ms % self.period_ms != 0 {
            return None;
        }
        usize::try_from(offset_ms / self.period_ms)
            .ok()
            .filter(|index| *index < self.len)
    }

    pub fn iter(&self) -> impl Iterator<Item = Timestamp> + '_ {
        (0..self.len).filter_map(move |index| self.get(index))
    }
}

fn exact_millis(delta: TimeDelta) -> Option<i64> {
    let millis = delta.num_milliseconds();
    (TimeDelta::milliseconds(millis) == delta).then_some(millis)
}

/// Outcome counters of placing observed rows onto a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub grid_len: usize,
    pub observed_rows: usize,
    pub filled_slots: usize,
    pub duplicates_overwritten: usize,
    pub off_grid_rows: usize,
}

impl ReindexReport {
    pub fn missing_slots(&self) -> usize {
        self.grid_len - self.filled_slots
    }
}

/// One value vector per grid slot; `None` marks a slot with no observation.
pub type Slots = Vec<Option<Vec<ChannelValue>>>;

/// Places rows onto `grid` by exact timestamp match. A later row for an already filled slot
/// replaces the earlier one.
pub fn place_on_grid<I>(grid: &TimeGrid, rows: I) -> (Slots, ReindexReport)
where
    I: IntoIterator<Item = (Timestamp, Vec<ChannelValue>)>,
{
    let mut slots: Slots = vec![None; grid.len()];
    let mut report = ReindexReport {
        grid_len: grid.len(),
        ..ReindexReport::default()
    };

    for (timestamp, values) in rows {
        report.observed_rows += 1;
        let Some(index) = grid.index_of(timestamp) else {
            report.off_grid_rows += 1;
            continue;
        };
        if slots[index].replace(values).is_some() {
            report.duplicates_overwritten += 1;
        } else {
            report.filled_slots += 1;
        }
    }

    (slots, report)
}

/// A series aligned to its regular grid: exactly one slot per grid instant.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedSeries {
    pub instrument: InstrumentKind,
    pub layout: ColumnLayout,
    pub heights: Vec<HeightLevel>,
    pub grid: TimeGrid,
    slots: Slots,
}

impl GriddedSeries {
    pub fn new(
        instrument: InstrumentKind,
        layout: ColumnLayout,
        heights: Vec<HeightLevel>,
        grid: TimeGrid,
        slots: Slots,
    ) -> Self {
        debug_assert_eq!(grid.len(), slots.len());
        Self {
            instrument,
            layout,
            heights,
            grid,
            slots,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn row_width(&self) -> usize {
        self.layout.width(self.heights.len())
    }

    pub fn slot(&self, index: usize) -> Option<&[ChannelValue]> {
        self.slots.get(index)?.as_deref()
    }

    /// Every grid instant with its observation, if any, in increasing time order.
    pub fn slots(&self) -> impl Iterator<Item = (Timestamp, Option<&[ChannelValue]>)> + '_ {
        self.grid
            .iter()
            .zip(self.slots.iter())
            .map(|(timestamp, slot)| (timestamp, slot.as_deref()))
    }

    pub fn observed(&self) -> impl Iterator<Item = (Timestamp, &[ChannelValue])> + '_ {
        self.slots()
            .filter_map(|(timestamp, slot)| slot.map(|values| (timestamp, values)))
    }

    pub fn missing_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    /// Reindexes this series' own observations onto its own grid.
    pub fn reindexed(&self) -> GriddedSeries {
        let rows = self
            .observed()
            .map(|(timestamp, values)| (timestamp, values.to_vec()));
        let (slots, _) = place_on_grid(&self.grid, rows);
        Self::new(
            self.instrument,
            self.layout.clone(),
            self.heights.clone(),
            self.grid.clone(),
            slots,
        )
    }
}

/// Aligns a parsed series to the regular grid spanning its bounds.
pub fn reindex(
    series: ParsedSeries,
    period: TimeDelta,
) -> Result<(GriddedSeries, ReindexReport), GridError> {
    let grid = TimeGrid::from_bounds(series.bounds, period)?;
    let rows = series
        .rows
        .into_iter()
        .map(|row| (row.timestamp, row.values));
    let (slots, report) = place_on_grid(&grid, rows);

    info!(
        instrument = %series.instrument,
        start = %grid.start(),
        end = %grid.end(),
        slots = report.grid_len,
        filled = report.filled_slots,
        missing = report.missing_slots(),
        duplicates = report.duplicates_overwritten,
        "reindexed series onto grid"
    );
    if report.off_grid_rows > 0 {
        warn!(
            instrument = %series.instrument,
            dropped = report.off_grid_rows,
            period_ms = grid.period_ms(),
            "dropped rows that do not fall on the grid"
        );
    }

    let gridded = GriddedSeries::new(
        series.instrument,
        series.layout,
        series.heights,
        grid,
        slots,
    );
    Ok((gridded, report))
}
