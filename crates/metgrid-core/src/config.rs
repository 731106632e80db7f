use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use metgrid_parser::InstrumentKind;

use crate::error::{PipelineError, Result};
use crate::grid::TOWER_PERIOD_MS;

pub const DEFAULT_MISSING_MARKER: &str = "NaN";
pub const RESULTS_DIR_NAME: &str = "results";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(PipelineError::Config(format!(
                "unknown output format '{other}' (expected csv or parquet)"
            ))),
        }
    }
}

/// Everything one batch run needs, as read from a TOML file and refined by CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub instrument: InstrumentKind,
    pub input_dir: PathBuf,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_missing_marker")]
    pub missing_marker: String,
    #[serde(default)]
    pub phase_ms: i64,
    #[serde(default)]
    pub write_full_20hz: bool,
    #[serde(default = "enabled")]
    pub write_profile: bool,
    #[serde(default = "enabled")]
    pub require_heights: bool,
    #[serde(default = "enabled")]
    pub require_consistent_heights: bool,
}

fn default_missing_marker() -> String {
    DEFAULT_MISSING_MARKER.to_string()
}

fn enabled() -> bool {
    true
}

impl RunConfig {
    pub fn new(instrument: InstrumentKind, input_dir: impl Into<PathBuf>) -> Self {
        Self {
            instrument,
            input_dir: input_dir.into(),
            pattern: None,
            output_dir: None,
            output_format: OutputFormat::default(),
            missing_marker: default_missing_marker(),
            phase_ms: 0,
            write_full_20hz: false,
            write_profile: true,
            require_heights: true,
            require_consistent_heights: true,
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn pattern(&self) -> &str {
        match (&self.pattern, self.instrument) {
            (Some(pattern), _) => pattern,
            (None, InstrumentKind::Profiler) => "*.sta",
            (None, InstrumentKind::Tower) => "*20Hz_*.dat",
        }
    }

    /// Configured output directory, else `results/` next to the input directory.
    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        match self.input_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(RESULTS_DIR_NAME),
            _ => PathBuf::from(RESULTS_DIR_NAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pattern().trim().is_empty() {
            return Err(PipelineError::Config("input pattern must not be empty".into()));
        }
        if self.missing_marker.contains(['\n', '\r', ',']) {
            return Err(PipelineError::Config(format!(
                "missing marker {:?} would break the CSV layout",
                self.missing_marker
            )));
        }
        if !(0..1000).contains(&self.phase_ms) || self.phase_ms % TOWER_PERIOD_MS != 0 {
            return Err(PipelineError::Config(format!(
                "phase_ms must be a multiple of {TOWER_PERIOD_MS} below 1000, got {}",
                self.phase_ms
            )));
        }
        Ok(())
    }
}
