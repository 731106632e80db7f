use std::collections::HashSet;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use serde::Serialize;
use tracing::{debug, warn};

use metgrid_parser::RawRecord;

use crate::error::{PipelineError, Result};

#[derive(Debug)]
pub struct FileInput<'a> {
    pub path: &'a str,
    pub contents: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Duplicate,
    Ingested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub hash: String,
    pub status: FileStatus,
    pub encoding: Option<TextEncoding>,
    pub records: usize,
}

/// Raw lines of every accepted file, numbered by accepted-file index and line.
#[derive(Debug, Default)]
pub struct IngestionBatch {
    pub records: Vec<RawRecord>,
    pub reports: Vec<FileReport>,
    /// Paths of accepted files, indexed like `RecordPosition::file_index`.
    pub accepted: Vec<String>,
}

impl IngestionBatch {
    pub fn duplicate_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.status == FileStatus::Duplicate)
            .count()
    }
}

pub fn ingest_files(inputs: &[FileInput<'_>]) -> IngestionBatch {
    let mut batch = IngestionBatch::default();
    let mut seen_hashes = HashSet::new();

    for input in inputs {
        let hash = compute_hash(input.contents);
        if !seen_hashes.insert(hash.clone()) {
            warn!(path = input.path, %hash, "skipping file with duplicate contents");
            batch.reports.push(FileReport {
                path: input.path.to_string(),
                hash,
                status: FileStatus::Duplicate,
                encoding: None,
                records: 0,
            });
            continue;
        }

        let file_index = batch.accepted.len();
        let (text, encoding) = decode_text(input.contents);
        let before = batch.records.len();
        batch.records.extend(
            text.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(line_index, line)| RawRecord::new(file_index, line_index, line)),
        );
        let records = batch.records.len() - before;

        debug!(path = input.path, file_index, records, ?encoding, "ingested file");
        batch.accepted.push(input.path.to_string());
        batch.reports.push(FileReport {
            path: input.path.to_string(),
            hash,
            status: FileStatus::Ingested,
            encoding: Some(encoding),
            records,
        });
    }

    batch
}

/// Decodes as UTF-8, falling back to Latin-1 where every byte maps to one code point.
pub fn decode_text(contents: &[u8]) -> (String, TextEncoding) {
    match std::str::from_utf8(contents) {
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        Err(_) => (
            contents.iter().map(|byte| char::from(*byte)).collect(),
            TextEncoding::Latin1,
        ),
    }
}

/// Files in `dir` matching `pattern`, ordered by file name.
pub fn discover_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = dir.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let mut paths = glob::glob(&full_pattern)?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    if paths.is_empty() {
        return Err(PipelineError::NoInputFiles(full_pattern.into_owned()));
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Reads every path, keeping the display path next to the bytes.
pub fn read_files(paths: &[PathBuf]) -> Result<Vec<(String, Vec<u8>)>> {
    paths
        .iter()
        .map(|path| -> Result<(String, Vec<u8>)> {
            Ok((path.display().to_string(), std::fs::read(path)?))
        })
        .collect()
}

pub fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}
