use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Table};
use metgrid_core::ingestion::FileStatus;
use metgrid_core::pipelines::all_pipeline_descriptors;
use metgrid_core::{execute_run, OutputFormat, RunConfig, RunSummary};
use metgrid_parser::InstrumentKind;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "METGRID_CONFIG";

#[derive(Parser, Debug)]
#[command(author, version, about = "Gap-filled regular tables from profiler and tower dumps", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reshape one instrument batch into output tables
    Run(RunArgs),
    /// List the registered processing pipelines
    Pipelines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InstrumentArg {
    Profiler,
    Tower,
}

impl From<InstrumentArg> for InstrumentKind {
    fn from(value: InstrumentArg) -> Self {
        match value {
            InstrumentArg::Profiler => InstrumentKind::Profiler,
            InstrumentArg::Tower => InstrumentKind::Tower,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Csv,
    Parquet,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Parquet => OutputFormat::Parquet,
        }
    }
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// TOML run description; defaults to $METGRID_CONFIG when set
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    instrument: Option<InstrumentArg>,
    /// Directory holding the raw dumps
    #[arg(long)]
    input_dir: Option<PathBuf>,
    /// Glob matched against file names inside the input directory
    #[arg(long)]
    pattern: Option<String>,
    /// Defaults to `results/` next to the input directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
    /// Text written for missing cells in CSV output
    #[arg(long)]
    missing_marker: Option<String>,
    /// Millisecond offset within each second kept by tower decimation
    #[arg(long)]
    phase_ms: Option<i64>,
    /// Also write every tower channel at 20 Hz
    #[arg(long)]
    full_20hz: bool,
    /// Skip the profiler by-height table
    #[arg(long)]
    no_profile: bool,
    /// Accept profiler input without a height declaration (PTH table only)
    #[arg(long)]
    allow_missing_heights: bool,
    /// Keep the first height declaration when files disagree
    #[arg(long)]
    allow_inconsistent_heights: bool,
}

impl RunArgs {
    /// Loads the config file, if any, and applies the flags on top.
    fn resolve(self, env_config: Option<PathBuf>) -> Result<RunConfig> {
        let config_path = self.config.clone().or(env_config);
        let mut config = match config_path {
            Some(path) => RunConfig::load(&path)
                .with_context(|| format!("failed to load run config {}", path.display()))?,
            None => {
                let (Some(instrument), Some(input_dir)) = (self.instrument, self.input_dir.clone())
                else {
                    bail!("--instrument and --input-dir are required without a config file");
                };
                RunConfig::new(instrument.into(), input_dir)
            }
        };

        if let Some(instrument) = self.instrument {
            config.instrument = instrument.into();
        }
        if let Some(input_dir) = self.input_dir {
            config.input_dir = input_dir;
        }
        if let Some(pattern) = self.pattern {
            config.pattern = Some(pattern);
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = Some(output_dir);
        }
        if let Some(format) = self.format {
            config.output_format = format.into();
        }
        if let Some(marker) = self.missing_marker {
            config.missing_marker = marker;
        }
        if let Some(phase_ms) = self.phase_ms {
            config.phase_ms = phase_ms;
        }
        config.write_full_20hz |= self.full_20hz;
        config.write_profile &= !self.no_profile;
        config.require_heights &= !self.allow_missing_heights;
        config.require_consistent_heights &= !self.allow_inconsistent_heights;

        config.validate().context("invalid run configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match cli.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
    }

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Pipelines => {
            print_pipelines();
            Ok(())
        }
    }
}

fn handle_run(args: RunArgs) -> Result<()> {
    let env_config = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = args.resolve(env_config)?;
    info!(
        instrument = %config.instrument,
        input_dir = %config.input_dir.display(),
        pattern = config.pattern(),
        "starting run"
    );

    let summary = execute_run(&config).with_context(|| {
        format!(
            "{} run over {} failed",
            config.instrument,
            config.input_dir.display()
        )
    })?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["table", "rows", "first", "last", "path"]);
    for written in &summary.tables {
        let format = |value: Option<metgrid_parser::Timestamp>| {
            value.map(|ts| ts.to_string()).unwrap_or_default()
        };
        table.add_row(vec![
            written.label.clone(),
            written.rows.to_string(),
            format(written.first_timestamp),
            format(written.last_timestamp),
            written.path.display().to_string(),
        ]);
    }
    println!("{table}");

    let skipped = summary
        .files
        .iter()
        .filter(|file| file.status == FileStatus::Duplicate)
        .count();
    println!(
        "{} file(s) read, {} skipped as duplicates; grid of {} slots with {} gaps; manifest at {}",
        summary.files.len(),
        skipped,
        summary.reindex.grid_len,
        summary.reindex.missing_slots(),
        summary.manifest.display()
    );
    println!(
        "{} finished in {:.2?}",
        summary.pipeline, summary.elapsed
    );
}

fn print_pipelines() {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["code", "version", "instrument", "parser"]);
    for descriptor in all_pipeline_descriptors() {
        table.add_row(vec![
            descriptor.code.to_string(),
            descriptor.version.to_string(),
            descriptor.instrument.to_string(),
            descriptor.parser.to_string(),
        ]);
    }
    println!("{table}");
}
