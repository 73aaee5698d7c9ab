// Windowed analyzers attached to a serial reader
//
// `SampleAnalyzer` is what the dispatcher talks to. `AnalyzerWindow` implements
// it for any reducer by guarding a `SampleWindow` with its own lock, so one
// analyzer's updates never wait on another analyzer's getters.
//
// `WindowedAnalyzer` is the owning handle: it registers the window with the
// reader on construction, deregisters it on drop, and keeps the reader alive
// in between.

use crate::error::SourceResult;
use crate::reader::SerialReader;
use crate::reducer::{Mean, Median, Reducer, ReducerKind};
use crate::source::SourceConfig;
use crate::types::{TimestampedText, TimestampedValue};
use crate::window::{SampleWindow, WindowUpdate};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Consumer of reader records
pub trait SampleAnalyzer: Send + Sync {
    /// Called by the dispatcher for every record, control records included
    fn fetch_new_data(&self, record: &TimestampedText);

    /// Latest raw sample, or the sentinel
    fn raw_data(&self) -> TimestampedValue;

    /// Latest processed value, or the sentinel
    fn processed_data(&self) -> TimestampedValue;

    fn name(&self) -> &str;
}

/// Lock-protected window fed by the dispatcher
pub struct AnalyzerWindow<R: Reducer> {
    reducer: R,
    state: Mutex<SampleWindow>,
    dropped_samples: AtomicU64,
}

impl<R: Reducer> AnalyzerWindow<R> {
    pub fn new(reducer: R, radius: usize) -> Self {
        Self {
            reducer,
            state: Mutex::new(SampleWindow::new(radius)),
            dropped_samples: AtomicU64::new(0),
        }
    }

    pub fn radius(&self) -> usize {
        self.state.lock().radius()
    }

    /// Samples currently buffered
    pub fn window_len(&self) -> usize {
        self.state.lock().len()
    }

    /// Records that could not be parsed as a sample
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }
}

impl<R: Reducer> SampleAnalyzer for AnalyzerWindow<R> {
    fn fetch_new_data(&self, record: &TimestampedText) {
        let update = self.state.lock().apply(record, &self.reducer);

        match update {
            WindowUpdate::Reset => {
                log::debug!(
                    "{}: no data received, reader is in {} state",
                    self.reducer.name(),
                    record.text
                );
            }
            WindowUpdate::Rejected => {
                self.dropped_samples.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "{}: dropping sample with wrong format or out of range: {:?}",
                    self.reducer.name(),
                    record.text
                );
            }
            WindowUpdate::Filling { .. } | WindowUpdate::Processed(_) => {}
        }
    }

    fn raw_data(&self) -> TimestampedValue {
        self.state.lock().raw()
    }

    fn processed_data(&self) -> TimestampedValue {
        self.state.lock().processed()
    }

    fn name(&self) -> &str {
        self.reducer.name()
    }
}

/// Analyzer registered with a serial reader for its whole lifetime
pub struct WindowedAnalyzer<R: Reducer> {
    window: Arc<AnalyzerWindow<R>>,
    handle: Weak<dyn SampleAnalyzer>,
    registered: bool,
    reader: Arc<SerialReader>,
}

/// Median filter over `2k+1` samples
pub type MedianFilter = WindowedAnalyzer<Median>;

/// Moving average over `2k+1` samples
pub type MovingAverageFilter = WindowedAnalyzer<Mean>;

/// Analyzer whose reducer is picked at runtime
pub type DynAnalyzer = WindowedAnalyzer<Box<dyn Reducer>>;

impl<R: Reducer + Default> WindowedAnalyzer<R> {
    /// Attach to a running reader
    pub fn attach(reader: Arc<SerialReader>, radius: usize) -> Self {
        Self::with_reducer(reader, radius, R::default())
    }

    /// Open a new reader for `config` and attach to it
    pub fn open(config: &SourceConfig, radius: usize) -> SourceResult<Self> {
        Ok(Self::attach(SerialReader::open(config)?, radius))
    }
}

impl<R: Reducer> WindowedAnalyzer<R> {
    pub fn with_reducer(reader: Arc<SerialReader>, radius: usize, reducer: R) -> Self {
        let window = Arc::new(AnalyzerWindow::new(reducer, radius));
        let as_dyn: Arc<dyn SampleAnalyzer> = window.clone();
        let handle = Arc::downgrade(&as_dyn);

        let registered = reader.register_analyzer(handle.clone());
        if !registered {
            log::warn!(
                "{}: registering to serial reader {} failed",
                window.name(),
                reader.description()
            );
        }

        Self {
            window,
            handle,
            registered,
            reader,
        }
    }

    pub fn raw_data(&self) -> TimestampedValue {
        self.window.raw_data()
    }

    pub fn processed_data(&self) -> TimestampedValue {
        self.window.processed_data()
    }

    pub fn name(&self) -> &str {
        self.window.name()
    }

    /// The reader this analyzer is attached to
    pub fn reader(&self) -> &Arc<SerialReader> {
        &self.reader
    }

    /// Whether construction-time registration succeeded
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Registry handle of this analyzer
    pub fn handle(&self) -> Weak<dyn SampleAnalyzer> {
        self.handle.clone()
    }

    pub fn radius(&self) -> usize {
        self.window.radius()
    }

    pub fn window_len(&self) -> usize {
        self.window.window_len()
    }

    pub fn dropped_samples(&self) -> u64 {
        self.window.dropped_samples()
    }
}

impl<R: Reducer> Drop for WindowedAnalyzer<R> {
    fn drop(&mut self) {
        self.reader.deregister_analyzer(&self.handle);
    }
}

/// Build an analyzer of the given kind on `reader`
pub fn build_analyzer(kind: ReducerKind, reader: Arc<SerialReader>, radius: usize) -> DynAnalyzer {
    WindowedAnalyzer::with_reducer(reader, radius, kind.reducer())
}
