use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use tracing::{info, warn};

use metgrid_parser::{
    default_parser, HeightLevel, InstrumentKind, InstrumentParser, ProfilerParser, SeriesBounds,
    TowerParser, HEIGHT_DECLARATION_MARKER,
};

use crate::config::RunConfig;
use crate::error::{PipelineError, Result};
use crate::grid::{nominal_period, reindex, ReindexReport};
use crate::ingestion::IngestionBatch;
use crate::outputs::{LabelledTable, OutputLabel};
use crate::reshape::{ProfilerReshape, Reshape, TowerReshape};

/// Run-wide switches the pipelines read; built from a [`RunConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub phase_ms: i64,
    pub write_full_20hz: bool,
    pub write_profile: bool,
    pub require_heights: bool,
    pub require_consistent_heights: bool,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            phase_ms: 0,
            write_full_20hz: false,
            write_profile: true,
            require_heights: true,
            require_consistent_heights: true,
        }
    }
}

impl From<&RunConfig> for ExecutionContext {
    fn from(config: &RunConfig) -> Self {
        Self {
            phase_ms: config.phase_ms,
            write_full_20hz: config.write_full_20hz,
            write_profile: config.write_profile,
            require_heights: config.require_heights,
            require_consistent_heights: config.require_consistent_heights,
        }
    }
}

#[derive(Debug)]
pub struct PipelineBatchOutput {
    pub label: OutputLabel,
    pub tables: Vec<LabelledTable>,
    pub reindex: ReindexReport,
    pub heights: Vec<HeightLevel>,
    pub bounds: SeriesBounds,
}

pub trait ProcessingPipeline: Send + Sync {
    fn code_identifier(&self) -> &'static str;
    fn version(&self) -> &'static str;
    fn instrument(&self) -> InstrumentKind;
    fn run_batch(
        &self,
        context: &ExecutionContext,
        batch: &IngestionBatch,
    ) -> Result<PipelineBatchOutput>;
}

#[derive(Debug, Clone)]
pub struct ProcessingPipelineDescriptor {
    pub code: &'static str,
    pub version: &'static str,
    pub instrument: InstrumentKind,
    pub parser: &'static str,
}

static PIPELINES: Lazy<Vec<ProcessingPipelineDescriptor>> = Lazy::new(|| {
    vec![
        ProcessingPipelineDescriptor {
            code: ProfilerPipeline::CODE,
            version: "0.1.0",
            instrument: InstrumentKind::Profiler,
            parser: ProfilerParser::NAME,
        },
        ProcessingPipelineDescriptor {
            code: TowerPipeline::CODE,
            version: "0.1.0",
            instrument: InstrumentKind::Tower,
            parser: TowerParser::NAME,
        },
    ]
});

static PIPELINE_IMPLEMENTATIONS: Lazy<Vec<&'static dyn ProcessingPipeline>> = Lazy::new(|| {
    vec![
        &ProfilerPipeline as &dyn ProcessingPipeline,
        &TowerPipeline as &dyn ProcessingPipeline,
    ]
});

pub fn all_pipeline_descriptors() -> &'static [ProcessingPipelineDescriptor] {
    PIPELINES.as_slice()
}

pub fn all_pipelines() -> &'static [&'static dyn ProcessingPipeline] {
    PIPELINE_IMPLEMENTATIONS.as_slice()
}

pub fn pipeline_for(instrument: InstrumentKind) -> Result<&'static dyn ProcessingPipeline> {
    all_pipelines()
        .iter()
        .copied()
        .find(|pipeline| pipeline.instrument() == instrument)
        .ok_or_else(|| PipelineError::Config(format!("no pipeline handles {instrument} input")))
}

/// Scanning wind profiler: PTH table plus the by-height profile table.
pub struct ProfilerPipeline;

impl ProfilerPipeline {
    pub const CODE: &'static str = "profiler_sta_v1";

    fn warn_undeclared_files(batch: &IngestionBatch) {
        let declared: BTreeSet<usize> = batch
            .records
            .iter()
            .filter(|record| record.text.trim_start().starts_with(HEIGHT_DECLARATION_MARKER))
            .map(|record| record.position.file_index)
            .collect();

        for (file_index, path) in batch.accepted.iter().enumerate() {
            if !declared.contains(&file_index) {
                warn!(path = %path, file_index, "file carries no height declaration");
            }
        }
    }
}

impl ProcessingPipeline for ProfilerPipeline {
    fn code_identifier(&self) -> &'static str {
        Self::CODE
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn instrument(&self) -> InstrumentKind {
        InstrumentKind::Profiler
    }

    fn run_batch(
        &self,
        context: &ExecutionContext,
        batch: &IngestionBatch,
    ) -> Result<PipelineBatchOutput> {
        Self::warn_undeclared_files(batch);

        let parser = ProfilerParser {
            require_heights: context.require_heights,
            require_consistent_heights: context.require_consistent_heights,
        };
        let series = parser.parse(&batch.records)?;
        let heights = series.heights.clone();
        let bounds = series.bounds;

        let (gridded, report) = reindex(series, nominal_period(InstrumentKind::Profiler))?;
        let reshape = ProfilerReshape {
            include_profile: context.write_profile,
        };
        let tables = reshape.reshape(&gridded)?;

        // Duplicates still bound the label: it names the discovered range, not the parsed one.
        let discovered: Vec<&str> = batch
            .reports
            .iter()
            .map(|report| report.path.as_str())
            .collect();
        let label = OutputLabel::from_file_names(&discovered).ok_or_else(|| {
            PipelineError::Validation("profiler run has no input files".into())
        })?;
        info!(
            pipeline = Self::CODE,
            heights = heights.len(),
            tables = tables.len(),
            label = %label.prefix(),
            "profiler batch reshaped"
        );

        Ok(PipelineBatchOutput {
            tables: tables
                .into_iter()
                .map(|table| LabelledTable {
                    label: label.for_table(table.purpose),
                    table,
                })
                .collect(),
            label,
            reindex: report,
            heights,
            bounds,
        })
    }
}

/// 20 Hz tower: sonic projection, 1 Hz decimation and optionally every channel at 20 Hz.
pub struct TowerPipeline;

impl TowerPipeline {
    pub const CODE: &'static str = "tower_20hz_v1";
}

impl ProcessingPipeline for TowerPipeline {
    fn code_identifier(&self) -> &'static str {
        Self::CODE
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn instrument(&self) -> InstrumentKind {
        InstrumentKind::Tower
    }

    fn run_batch(
        &self,
        context: &ExecutionContext,
        batch: &IngestionBatch,
    ) -> Result<PipelineBatchOutput> {
        let series = default_parser(InstrumentKind::Tower).parse(&batch.records)?;
        let bounds = series.bounds;

        let (gridded, report) = reindex(series, nominal_period(InstrumentKind::Tower))?;
        let reshape = TowerReshape {
            phase_ms: context.phase_ms,
            include_full_20hz: context.write_full_20hz,
        };
        let tables = reshape.reshape(&gridded)?;

        let label = OutputLabel::from_bounds(bounds);
        info!(
            pipeline = Self::CODE,
            tables = tables.len(),
            label = %label.prefix(),
            "tower batch reshaped"
        );

        Ok(PipelineBatchOutput {
            tables: tables
                .into_iter()
                .map(|table| LabelledTable {
                    label: label.for_table(table.purpose),
                    table,
                })
                .collect(),
            label,
            reindex: report,
            heights: Vec::new(),
            bounds,
        })
    }
}
