pub mod classify;
pub mod errors;
pub mod formats;
pub mod model;
mod registry;
pub mod timestamp;

pub use classify::{classify_records, ClassifiedRecords, HEIGHT_DECLARATION_MARKER};
pub use errors::ParserError;
pub use formats::layout::SONIC_3D_CHANNELS;
pub use formats::{ProfilerParser, TowerParser};
pub use model::{
    ChannelKind, ChannelValue, ColumnLayout, ColumnSpec, HeightLevel, InstrumentKind,
    ObservedRow, ParsedSeries, RawRecord, RecordPosition, SeriesBounds, Timestamp,
};
pub use registry::{default_parser, InstrumentParser};
