use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::RunConfig;
use crate::error::Result;
use crate::grid::ReindexReport;
use crate::ingestion::{discover_files, ingest_files, read_files, FileInput, FileReport};
use crate::outputs::{
    write_manifest, write_tables, OutputLabel, RunManifest, StagedOutput, WrittenTable,
};
use crate::pipelines::{pipeline_for, ExecutionContext};

#[derive(Debug)]
pub struct RunSummary {
    pub pipeline: &'static str,
    pub label: OutputLabel,
    pub files: Vec<FileReport>,
    pub reindex: ReindexReport,
    pub tables: Vec<WrittenTable>,
    pub manifest: PathBuf,
    pub elapsed: Duration,
}

/// Discovers, ingests, reshapes and writes one instrument batch.
pub fn execute_run(config: &RunConfig) -> Result<RunSummary> {
    let started = Instant::now();
    config.validate()?;

    let paths = discover_files(&config.input_dir, config.pattern())?;
    let contents = read_files(&paths)?;
    let inputs: Vec<FileInput<'_>> = contents
        .iter()
        .map(|(path, bytes)| FileInput {
            path: path.as_str(),
            contents: bytes.as_slice(),
        })
        .collect();
    let batch = ingest_files(&inputs);
    info!(
        instrument = %config.instrument,
        files = paths.len(),
        duplicates = batch.duplicate_count(),
        records = batch.records.len(),
        "ingested input files"
    );

    let pipeline = pipeline_for(config.instrument)?;
    let output = pipeline.run_batch(&ExecutionContext::from(config), &batch)?;

    let output_dir = config.output_dir();
    let mut staged = StagedOutput::default();
    let written = write_tables(
        &output.tables,
        &output_dir,
        config.output_format,
        &config.missing_marker,
        &mut staged,
    )?;
    let manifest = write_manifest(
        &output_dir,
        &output.label,
        &RunManifest {
            pipeline: pipeline.code_identifier(),
            version: pipeline.version(),
            files: &batch.reports,
            reindex: (&output.reindex).into(),
            tables: &written,
        },
        &mut staged,
    )?;
    staged.commit()?;

    let elapsed = started.elapsed();
    info!(
        pipeline = pipeline.code_identifier(),
        files = paths.len(),
        tables = written.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "run complete"
    );

    Ok(RunSummary {
        pipeline: pipeline.code_identifier(),
        label: output.label,
        files: batch.reports,
        reindex: output.reindex,
        tables: written,
        manifest,
        elapsed,
    })
}
