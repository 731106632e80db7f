use thiserror::Error;

use crate::model::{HeightLevel, RecordPosition};

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{parser} found no data rows among {records} input records")]
    EmptyInput {
        parser: &'static str,
        records: usize,
    },

    #[error("{parser} input has no height-levels declaration row")]
    MissingHeightDeclaration { parser: &'static str },

    #[error("{parser} malformed timestamp at {position}: {message}")]
    MalformedTimestamp {
        parser: &'static str,
        position: RecordPosition,
        message: String,
    },

    #[error("{parser} channel '{field}' at {position} is not numeric: '{value}'")]
    InvalidChannelValue {
        parser: &'static str,
        field: String,
        value: String,
        position: RecordPosition,
    },

    #[error(
        "{parser} height levels declared at {position} ({found:?}) differ from the first declaration ({expected:?})"
    )]
    InconsistentHeightSet {
        parser: &'static str,
        position: RecordPosition,
        expected: Vec<HeightLevel>,
        found: Vec<HeightLevel>,
    },

    #[error("{parser} record layout invalid: {message}")]
    LayoutMismatch {
        parser: &'static str,
        message: String,
    },

    #[error("{parser} data row at {position} invalid: {message}")]
    DataRow {
        parser: &'static str,
        position: RecordPosition,
        message: String,
    },

    #[error("{parser} CSV error at {position}: {source}")]
    Csv {
        parser: &'static str,
        position: RecordPosition,
        #[source]
        source: csv::Error,
    },
}
