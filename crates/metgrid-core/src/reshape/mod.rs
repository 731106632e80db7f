mod decimate;
mod profile;

pub use decimate::{
    decimate_to_1hz, project_columns, tower_20hz_table, DECIMATION_DROPPED_COLUMNS,
};
pub use profile::{height_profile_table, pth_table};

use metgrid_parser::SONIC_3D_CHANNELS;

use crate::error::Result;
use crate::grid::GriddedSeries;
use crate::table::{ObservationTable, TablePurpose};

/// Turns a gridded series into the long-format tables of its instrument.
pub trait Reshape: Send + Sync {
    fn reshape(&self, series: &GriddedSeries) -> Result<Vec<ObservationTable>>;
}

#[derive(Debug, Clone, Copy)]
pub struct ProfilerReshape {
    /// Emit the by-height table next to the PTH table.
    pub include_profile: bool,
}

impl Default for ProfilerReshape {
    fn default() -> Self {
        Self {
            include_profile: true,
        }
    }
}

impl Reshape for ProfilerReshape {
    fn reshape(&self, series: &GriddedSeries) -> Result<Vec<ObservationTable>> {
        let mut tables = vec![pth_table(series)];
        if self.include_profile && !series.heights.is_empty() {
            tables.push(height_profile_table(series));
        }
        Ok(tables)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TowerReshape {
    /// Millisecond offset within each second kept by decimation.
    pub phase_ms: i64,
    /// Emit every tower channel at 20 Hz, not only the sonic projection.
    pub include_full_20hz: bool,
}

impl Reshape for TowerReshape {
    fn reshape(&self, series: &GriddedSeries) -> Result<Vec<ObservationTable>> {
        let full = tower_20hz_table(series);
        let sonic = project_columns(&full, TablePurpose::Sonic3d20Hz, &SONIC_3D_CHANNELS)?;
        let decimated = decimate_to_1hz(series, self.phase_ms, &DECIMATION_DROPPED_COLUMNS)?;

        let mut tables = vec![sonic, decimated];
        if self.include_full_20hz {
            tables.insert(0, full);
        }
        Ok(tables)
    }
}
