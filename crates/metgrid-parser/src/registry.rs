use crate::errors::ParserError;
use crate::formats::{ProfilerParser, TowerParser};
use crate::model::{InstrumentKind, ParsedSeries, RawRecord};

pub trait InstrumentParser: Send + Sync {
    fn name(&self) -> &'static str;
    fn instrument(&self) -> InstrumentKind;
    fn parse(&self, records: &[RawRecord]) -> Result<ParsedSeries, ParserError>;
}

/// Returns the parser for `instrument` with its default settings.
pub fn default_parser(instrument: InstrumentKind) -> Box<dyn InstrumentParser> {
    match instrument {
        InstrumentKind::Profiler => Box::new(ProfilerParser::default()),
        InstrumentKind::Tower => Box::new(TowerParser),
    }
}
