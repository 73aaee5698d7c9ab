// Serial sample reader with windowed analyzers
//
// - `source`: fixed-size frame sources (serial port, recorded file)
// - `reader`: reader and dispatcher threads owning one source
// - `registry`: weak registry of attached analyzers
// - `window`: the sliding window state machine
// - `reducer`: median and mean reductions
// - `analyzer`: lock-protected analyzers and their owning handles
// - `config`: monitor configuration

pub mod analyzer;
pub mod config;
pub mod error;
pub mod reader;
pub mod reducer;
pub mod registry;
pub mod source;
pub mod types;
pub mod window;

pub use analyzer::{
    build_analyzer, AnalyzerWindow, DynAnalyzer, MedianFilter, MovingAverageFilter, SampleAnalyzer,
    WindowedAnalyzer,
};
pub use config::{AnalyzerSpec, MonitorConfig};
pub use error::{ConfigError, ConfigResult, SourceError, SourceResult};
pub use reader::SerialReader;
pub use reducer::{Mean, Median, Reducer, ReducerKind};
pub use source::{open_source, FrameSource, SourceConfig};
pub use types::{ControlState, ReaderStats, TimestampedText, TimestampedValue, NO_TIMESTAMP};
pub use window::{check_radius, SampleWindow, WindowUpdate, MAX_RADIUS};
