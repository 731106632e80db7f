use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Utc;
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use metgrid_parser::{SeriesBounds, Timestamp};

use crate::config::OutputFormat;
use crate::error::Result;
use crate::grid::ReindexReport;
use crate::ingestion::FileReport;
use crate::table::{ObservationTable, TablePurpose};

/// First and last identifiers of the time range a run covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLabel {
    pub first: String,
    pub last: String,
}

impl OutputLabel {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
        }
    }

    pub fn prefix(&self) -> String {
        format!("{}_to_{}", self.first, self.last)
    }

    pub fn for_table(&self, purpose: TablePurpose) -> String {
        format!("{}_{}", self.prefix(), purpose.suffix())
    }

    pub fn manifest_name(&self) -> String {
        format!("{}_manifest.json", self.prefix())
    }

    /// Profiler runs are labelled by the dates in their first and last file names.
    pub fn from_file_names<S: AsRef<str>>(paths: &[S]) -> Option<Self> {
        let first = paths.first()?;
        let last = paths.last()?;
        Some(Self::new(
            file_identifier(first.as_ref()),
            file_identifier(last.as_ref()),
        ))
    }

    /// Tower runs are labelled by the dates of their first and last rows.
    pub fn from_bounds(bounds: SeriesBounds) -> Self {
        let format = |timestamp: Timestamp| timestamp.format("%y_%m_%d").to_string();
        Self::new(format(bounds.start), format(bounds.end))
    }
}

/// `WLS7-436_2021_09_14__00_00_00.sta` becomes `210914`; other names fall back to their stem.
pub fn file_identifier(path: &str) -> String {
    let path = Path::new(path);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let tokens: Vec<&str> = stem.split('_').collect();
    let date = tokens.get(1..4).filter(|parts| {
        parts[0].len() == 4
            && parts[1].len() == 2
            && parts[2].len() == 2
            && parts
                .iter()
                .all(|part| part.bytes().all(|byte| byte.is_ascii_digit()))
    });

    match date {
        Some(parts) => format!("{}{}{}", &parts[0][2..], parts[1], parts[2]),
        None => stem,
    }
}

#[derive(Debug, Clone)]
pub struct LabelledTable {
    pub label: String,
    pub table: ObservationTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenTable {
    pub label: String,
    pub path: PathBuf,
    pub rows: usize,
    pub first_timestamp: Option<Timestamp>,
    pub last_timestamp: Option<Timestamp>,
}

/// Files written under a hidden `.partial` name, renamed into place only by [`commit`].
/// Dropping an uncommitted set removes whatever it staged.
///
/// [`commit`]: StagedOutput::commit
#[derive(Debug, Default)]
pub struct StagedOutput {
    /// `(staged, final)` path pairs in write order.
    staged: Vec<(PathBuf, PathBuf)>,
}

impl StagedOutput {
    /// Runs `write` against the staging path for `final_path`.
    pub fn stage<F>(&mut self, final_path: PathBuf, write: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let file_name = final_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = final_path.with_file_name(format!(".{file_name}.partial"));
        // Registered first so a half-written file is removed too.
        self.staged.push((staging.clone(), final_path));
        write(&staging)
    }

    /// Moves every staged file to its final name. A failed rename removes the files already moved.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let pending = std::mem::take(&mut self.staged);
        let mut committed = Vec::with_capacity(pending.len());

        let mut remaining = pending.into_iter();
        while let Some((staging, final_path)) = remaining.next() {
            if let Err(err) = std::fs::rename(&staging, &final_path) {
                warn!(path = %final_path.display(), %err, "rename failed; rolling back outputs");
                for path in &committed {
                    let _ = std::fs::remove_file(path);
                }
                self.staged.push((staging, final_path));
                self.staged.extend(remaining);
                return Err(err.into());
            }
            committed.push(final_path);
        }
        Ok(committed)
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        for (staging, _) in self.staged.drain(..) {
            if staging.exists() {
                let _ = std::fs::remove_file(&staging);
            }
        }
    }
}

/// Converts every table before writing any, then stages each file in `staged`.
pub fn write_tables(
    tables: &[LabelledTable],
    dir: &Path,
    format: OutputFormat,
    missing_marker: &str,
    staged: &mut StagedOutput,
) -> Result<Vec<WrittenTable>> {
    let frames = tables
        .iter()
        .map(|labelled| labelled.table.to_dataframe().map(|df| (labelled, df)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    std::fs::create_dir_all(dir)?;

    frames
        .into_iter()
        .map(|(labelled, mut df)| -> Result<WrittenTable> {
            let path = dir.join(format!("{}.{}", labelled.label, format.extension()));
            staged.stage(path.clone(), |staging| match format {
                OutputFormat::Csv => write_csv(
                    &mut df,
                    staging,
                    labelled.table.purpose.datetime_format(),
                    missing_marker,
                ),
                OutputFormat::Parquet => write_parquet(&mut df, staging),
            })?;
            info!(
                label = %labelled.label,
                rows = df.height(),
                path = %path.display(),
                "staged table"
            );

            Ok(WrittenTable {
                label: labelled.label.clone(),
                path,
                rows: labelled.table.len(),
                first_timestamp: labelled.table.first_timestamp(),
                last_timestamp: labelled.table.last_timestamp(),
            })
        })
        .collect()
}

fn write_csv(
    df: &mut DataFrame,
    path: &Path,
    datetime_format: &str,
    missing_marker: &str,
) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(datetime_format.to_string()))
        .with_null_value(missing_marker.to_string())
        .finish(df)?;
    Ok(())
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    ParquetWriter::new(&mut file)
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(df)?;
    Ok(())
}

/// What a run read and wrote, stored next to its tables.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest<'a> {
    pub pipeline: &'static str,
    pub version: &'static str,
    pub files: &'a [FileReport],
    pub reindex: ReindexSummary,
    pub tables: &'a [WrittenTable],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReindexSummary {
    pub grid_len: usize,
    pub observed_rows: usize,
    pub filled_slots: usize,
    pub missing_slots: usize,
    pub duplicates_overwritten: usize,
    pub off_grid_rows: usize,
}

impl From<&ReindexReport> for ReindexSummary {
    fn from(report: &ReindexReport) -> Self {
        Self {
            grid_len: report.grid_len,
            observed_rows: report.observed_rows,
            filled_slots: report.filled_slots,
            missing_slots: report.missing_slots(),
            duplicates_overwritten: report.duplicates_overwritten,
            off_grid_rows: report.off_grid_rows,
        }
    }
}

pub fn write_manifest(
    dir: &Path,
    label: &OutputLabel,
    manifest: &RunManifest<'_>,
    staged: &mut StagedOutput,
) -> Result<PathBuf> {
    let document = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "label": label.prefix(),
        "run": manifest,
    });
    let bytes = serde_json::to_vec_pretty(&document)?;

    let path = dir.join(label.manifest_name());
    staged.stage(path.clone(), |staging| Ok(std::fs::write(staging, &bytes)?))?;
    Ok(path)
}
