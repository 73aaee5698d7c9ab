// Serial reader - owns a frame source and fans readings out to analyzers
//
// Two threads run per reader:
// - `serial-reader`: blocks on the source, stores each frame as the latest
//   record and wakes the dispatcher. The first failed read makes the reader
//   permanently inactive and publishes an ERROR record.
// - `serial-dispatch`: delivers every published record, in order, to the
//   analyzers registered at that moment.
//
// Locking:
// - `last_record` (data lock) is written by the reader thread and held by the
//   dispatcher for the whole broadcast, so a slow analyzer stalls the reader's
//   next publish, `data()` callers and every other analyzer.
// - `registry` is independent of the data lock; registration only waits for a
//   broadcast in progress. Lock order is always registry, then data.
//
// The reader is shared through `Arc`; analyzers keep it alive while attached.
// Dropping the last handle stops the dispatcher, broadcasts CLOSED to any
// analyzer still registered and joins both threads. The join waits for a read
// in progress to return.

use crate::analyzer::SampleAnalyzer;
use crate::error::SourceResult;
use crate::registry::AnalyzerRegistry;
use crate::source::{open_source, FrameSource, SourceConfig};
use crate::types::{ControlState, ReaderStats, TimestampedText};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

/// Messages from the reader side to the dispatcher
enum Signal {
    Published(TimestampedText),
    Shutdown,
}

/// State shared with the reader and dispatcher threads
struct Shared {
    active: AtomicBool,
    last_record: Mutex<TimestampedText>,
    registry: Mutex<AnalyzerRegistry>,

    frames_read: AtomicU64,
    records_published: AtomicU64,
    deliveries: AtomicU64,
}

impl Shared {
    /// Store `record` as the latest one and queue it for dispatch.
    ///
    /// The send happens under the data lock so queue order matches write order.
    fn publish(&self, wake: &Sender<Signal>, record: TimestampedText, require_active: bool) -> bool {
        let mut last = self.last_record.lock();
        if require_active && !self.active.load(Ordering::SeqCst) {
            return false;
        }
        *last = record.clone();
        self.records_published.fetch_add(1, Ordering::Relaxed);
        // The dispatcher only goes away during shutdown
        let _ = wake.send(Signal::Published(record));
        true
    }
}

pub struct SerialReader {
    shared: Arc<Shared>,
    description: String,
    wake: Sender<Signal>,
    reader_thread: Option<JoinHandle<()>>,
    dispatch_thread: Option<JoinHandle<()>>,
}

impl SerialReader {
    /// Open the configured source and start reading from it
    pub fn open(config: &SourceConfig) -> SourceResult<Arc<Self>> {
        let source = open_source(config)?;
        Self::start(source)
    }

    /// Start reading from an already opened source
    pub fn start(source: Box<dyn FrameSource>) -> SourceResult<Arc<Self>> {
        let description = source.describe();
        let shared = Arc::new(Shared {
            active: AtomicBool::new(true),
            last_record: Mutex::new(TimestampedText::control(ControlState::Initializing)),
            registry: Mutex::new(AnalyzerRegistry::new()),
            frames_read: AtomicU64::new(0),
            records_published: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
        });
        let (wake, signals) = channel::unbounded();

        let dispatch_thread = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("serial-dispatch".to_string())
                .spawn(move || run_dispatcher(shared, signals))?
        };

        // From here on Drop cleans up whatever was started
        let mut reader = SerialReader {
            shared,
            description,
            wake,
            reader_thread: None,
            dispatch_thread: Some(dispatch_thread),
        };

        let reader_thread = {
            let shared = Arc::clone(&reader.shared);
            let wake = reader.wake.clone();
            thread::Builder::new()
                .name("serial-reader".to_string())
                .spawn(move || run_reader(shared, source, wake))?
        };
        reader.reader_thread = Some(reader_thread);

        log::info!("Serial reader started on {}", reader.description);
        Ok(Arc::new(reader))
    }

    /// False once a read has failed or shutdown began; never becomes true again
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Copy of the latest record
    pub fn data(&self) -> TimestampedText {
        self.shared.last_record.lock().clone()
    }

    /// Attach an analyzer.
    ///
    /// Returns false if the handle is dead, the reader is inactive, or the
    /// analyzer is already registered.
    pub fn register_analyzer(&self, handle: Weak<dyn SampleAnalyzer>) -> bool {
        let mut registry = self.shared.registry.lock();
        if !self.is_active() {
            return false;
        }
        registry.insert(handle)
    }

    /// Detach an analyzer; no-op if it is not registered
    pub fn deregister_analyzer(&self, handle: &Weak<dyn SampleAnalyzer>) {
        self.shared.registry.lock().remove(handle);
    }

    pub fn is_registered(&self, handle: &Weak<dyn SampleAnalyzer>) -> bool {
        self.shared.registry.lock().contains(handle)
    }

    pub fn registered_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    pub fn stats(&self) -> ReaderStats {
        ReaderStats {
            frames_read: self.shared.frames_read.load(Ordering::Relaxed),
            records_published: self.shared.records_published.load(Ordering::Relaxed),
            deliveries: self.shared.deliveries.load(Ordering::Relaxed),
        }
    }

    /// Description of the underlying source
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Drop for SerialReader {
    fn drop(&mut self) {
        self.shared.active.store(false, Ordering::SeqCst);

        // Records queued before this point are still delivered
        let _ = self.wake.send(Signal::Shutdown);
        if let Some(handle) = self.dispatch_thread.take() {
            if handle.join().is_err() {
                log::error!("Dispatcher thread for {} panicked", self.description);
            }
        }

        let closed = TimestampedText::control(ControlState::Closed);
        *self.shared.last_record.lock() = closed.clone();
        {
            let registry = self.shared.registry.lock();
            if !registry.is_empty() {
                log::debug!(
                    "Broadcasting CLOSED to {} analyzers still attached to {}",
                    registry.len(),
                    self.description
                );
                for analyzer in registry.live() {
                    analyzer.fetch_new_data(&closed);
                }
            }
        }

        if let Some(handle) = self.reader_thread.take() {
            if handle.join().is_err() {
                log::error!("Reader thread for {} panicked", self.description);
            }
        }

        log::info!("Serial reader on {} closed", self.description);
    }
}

/// Frame bytes to record text: up to the first NUL, surrounding whitespace trimmed
pub fn decode_frame(frame: &[u8]) -> String {
    let end = frame.iter().position(|&b| b == 0).unwrap_or(frame.len());
    String::from_utf8_lossy(&frame[..end]).trim().to_string()
}

fn run_reader(shared: Arc<Shared>, mut source: Box<dyn FrameSource>, wake: Sender<Signal>) {
    while shared.active.load(Ordering::SeqCst) {
        match source.read_frame() {
            Ok(frame) => {
                shared.frames_read.fetch_add(1, Ordering::Relaxed);
                let record = TimestampedText::now(decode_frame(&frame));
                if !shared.publish(&wake, record, true) {
                    // Shut down while the read was blocked
                    break;
                }
            }
            Err(e) => {
                // swap so a failure racing with shutdown does not publish ERROR
                if shared.active.swap(false, Ordering::SeqCst) {
                    log::warn!("Read from {} failed, reader is now inactive: {}", source.describe(), e);
                    shared.publish(&wake, TimestampedText::control(ControlState::Error), false);
                }
                break;
            }
        }
    }
    log::debug!("Reader loop for {} finished", source.describe());
}

fn run_dispatcher(shared: Arc<Shared>, signals: Receiver<Signal>) {
    for signal in signals.iter() {
        let record = match signal {
            Signal::Published(record) => record,
            Signal::Shutdown => break,
        };

        let registry = shared.registry.lock();
        if registry.is_empty() {
            continue;
        }

        let _data = shared.last_record.lock();
        log::trace!("Dispatching {:?} to {} analyzers", record, registry.len());
        for analyzer in registry.live() {
            analyzer.fetch_new_data(&record);
            shared.deliveries.fetch_add(1, Ordering::Relaxed);
        }
    }
    log::debug!("Dispatcher loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frame() {
        assert_eq!(decode_frame(b"  23.50\r\n"), "23.50");
        assert_eq!(decode_frame(b"12.5\0\0\0\0\0\0"), "12.5");
        assert_eq!(decode_frame(b"\0garbage"), "");
        assert_eq!(decode_frame(b"ab\xffc"), "ab\u{fffd}c");
    }
}
