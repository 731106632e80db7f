use crate::errors::ParserError;
use crate::model::{InstrumentKind, RawRecord};

/// First token of the profiler's height-levels declaration line.
pub const HEIGHT_DECLARATION_MARKER: &str = "Altitudes";

#[derive(Debug, Default)]
pub struct ClassifiedRecords<'a> {
    pub data_rows: Vec<&'a RawRecord>,
    pub metadata_rows: Vec<&'a RawRecord>,
}

/// Partitions raw lines into data rows and metadata rows, preserving input order.
///
/// Profiler lines are data when their first tab-separated token begins with a four digit year
/// and metadata when it begins with [`HEIGHT_DECLARATION_MARKER`]; every other profiler line is
/// header noise. Every tower line is data.
pub fn classify_records<'a>(
    parser: &'static str,
    instrument: InstrumentKind,
    records: &'a [RawRecord],
) -> Result<ClassifiedRecords<'a>, ParserError> {
    let mut classified = ClassifiedRecords::default();

    for record in records {
        match instrument {
            InstrumentKind::Profiler => {
                let first = first_tab_token(&record.text);
                if starts_with_year(first) {
                    classified.data_rows.push(record);
                } else if first.starts_with(HEIGHT_DECLARATION_MARKER) {
                    classified.metadata_rows.push(record);
                }
            }
            InstrumentKind::Tower => {
                if !record.text.trim().is_empty() {
                    classified.data_rows.push(record);
                }
            }
        }
    }

    if classified.data_rows.is_empty() {
        return Err(ParserError::EmptyInput {
            parser,
            records: records.len(),
        });
    }

    Ok(classified)
}

fn first_tab_token(text: &str) -> &str {
    text.split('\t').next().unwrap_or_default().trim()
}

fn starts_with_year(token: &str) -> bool {
    token.len() >= 4 && token.as_bytes()[..4].iter().all(u8::is_ascii_digit)
}
