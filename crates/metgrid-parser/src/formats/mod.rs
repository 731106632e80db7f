mod common;
pub mod layout;
mod profiler;
mod tower;

pub use layout::{BlockLayout, ChannelDescriptor, RecordLayout};
pub use profiler::ProfilerParser;
pub use tower::TowerParser;
