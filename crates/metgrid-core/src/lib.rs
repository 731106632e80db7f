pub mod config;
pub mod error;
pub mod grid;
pub mod ingestion;
pub mod outputs;
pub mod pipelines;
pub mod reshape;
pub mod run;
pub mod table;

pub use config::{OutputFormat, RunConfig};
pub use error::{PipelineError, Result};
pub use grid::{GriddedSeries, ReindexReport, TimeGrid};
pub use run::{execute_run, RunSummary};
pub use table::{ObservationRow, ObservationTable, TablePurpose};
