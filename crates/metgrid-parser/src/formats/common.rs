use crate::errors::ParserError;
use crate::model::{ChannelKind, ChannelValue, RawRecord, RecordPosition};

use super::layout::ChannelDescriptor;

pub(crate) fn split_tab_fields(text: &str) -> Vec<&str> {
    text.trim_end_matches(['\r', '\n']).split('\t').collect()
}

/// Tokenizes one comma-separated tower line, honouring quoted fields.
pub(crate) fn split_csv_fields(
    parser: &'static str,
    record: &RawRecord,
) -> Result<Vec<String>, ParserError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(record.text.as_bytes());

    match reader.records().next() {
        Some(Ok(fields)) => Ok(fields.iter().map(str::to_string).collect()),
        Some(Err(err)) => Err(ParserError::Csv {
            parser,
            position: record.position,
            source: err,
        }),
        None => Ok(Vec::new()),
    }
}

pub(crate) fn is_missing_token(value: &str) -> bool {
    let trimmed = value.trim().trim_matches('"');
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

pub(crate) fn parse_channel_value(
    parser: &'static str,
    channel: &ChannelDescriptor,
    value: &str,
    position: RecordPosition,
) -> Result<ChannelValue, ParserError> {
    if is_missing_token(value) {
        return Ok(ChannelValue::Missing);
    }
    let trimmed = value.trim();

    match channel.kind {
        ChannelKind::Text => Ok(ChannelValue::Text(trimmed.trim_matches('"').to_string())),
        ChannelKind::Numeric => trimmed
            .parse::<f64>()
            .map(ChannelValue::Number)
            .map_err(|_| ParserError::InvalidChannelValue {
                parser,
                field: channel.name.to_string(),
                value: trimmed.to_string(),
                position,
            }),
    }
}

/// Parses a channel at its offset; a field past the end of the line is missing.
pub(crate) fn parse_channel_at<S: AsRef<str>>(
    parser: &'static str,
    channel: &ChannelDescriptor,
    fields: &[S],
    base: usize,
    position: RecordPosition,
) -> Result<ChannelValue, ParserError> {
    match fields.get(base + channel.offset) {
        Some(value) => parse_channel_value(parser, channel, value.as_ref(), position),
        None => Ok(ChannelValue::Missing),
    }
}
