// Sliding sample window shared by every analyzer
//
// Holds the last `2k+1` samples newest first together with the current raw and
// processed readings. The processed reading is centered on the window: it
// carries the timestamp of the sample `k` positions behind the newest one.
// This type does no locking; `AnalyzerWindow` wraps it in a mutex.

use crate::reducer::Reducer;
use crate::types::{TimestampedText, TimestampedValue};
use std::collections::VecDeque;

/// Largest accepted radius; configurations and the CLI reject anything wider
pub const MAX_RADIUS: usize = 1 << 16;

// Samples reserved up front; wider windows grow as they fill
const PREALLOCATED_SAMPLES: usize = 1024;

/// Width `2 * radius + 1` of a window, or None if it does not fit in `usize`
pub fn window_width(radius: usize) -> Option<usize> {
    radius.checked_mul(2)?.checked_add(1)
}

/// Check a user supplied radius against `MAX_RADIUS`
pub fn check_radius(radius: usize) -> Result<usize, String> {
    if radius > MAX_RADIUS {
        return Err(format!(
            "radius {} is too large, the maximum is {}",
            radius, MAX_RADIUS
        ));
    }
    window_width(radius).ok_or_else(|| format!("radius {} overflows the window width", radius))
}

/// What a record did to the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowUpdate {
    /// Control record: everything cleared
    Reset,
    /// Text was not a usable number; nothing changed
    Rejected,
    /// Sample stored, window not full yet
    Filling { len: usize },
    /// Sample stored and a processed value computed
    Processed(TimestampedValue),
}

#[derive(Debug, Clone)]
pub struct SampleWindow {
    radius: usize,
    samples: VecDeque<TimestampedValue>,
    raw_legit: bool,
    processed_legit: bool,
    current_raw: TimestampedValue,
    current_processed: TimestampedValue,
}

impl SampleWindow {
    pub fn new(radius: usize) -> Self {
        Self {
            radius,
            samples: VecDeque::with_capacity(
                window_width(radius).map_or(PREALLOCATED_SAMPLES, |w| w.min(PREALLOCATED_SAMPLES)),
            ),
            raw_legit: false,
            processed_legit: false,
            current_raw: TimestampedValue::SENTINEL,
            current_processed: TimestampedValue::SENTINEL,
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Window width `2 * radius + 1`, saturating at `usize::MAX`
    pub fn width(&self) -> usize {
        window_width(self.radius).unwrap_or(usize::MAX)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.width()
    }

    pub fn raw_legit(&self) -> bool {
        self.raw_legit
    }

    pub fn processed_legit(&self) -> bool {
        self.processed_legit
    }

    /// Buffered samples, newest first
    pub fn samples(&self) -> impl Iterator<Item = &TimestampedValue> {
        self.samples.iter()
    }

    pub fn raw(&self) -> TimestampedValue {
        if self.raw_legit {
            self.current_raw
        } else {
            TimestampedValue::SENTINEL
        }
    }

    pub fn processed(&self) -> TimestampedValue {
        if self.processed_legit {
            self.current_processed
        } else {
            TimestampedValue::SENTINEL
        }
    }

    /// Forget every sample and both readings
    pub fn reset(&mut self) {
        self.raw_legit = false;
        self.processed_legit = false;
        self.samples.clear();
        self.current_raw = TimestampedValue::SENTINEL;
        self.current_processed = TimestampedValue::SENTINEL;
    }

    /// Feed one record from the reader
    pub fn apply<R: Reducer + ?Sized>(&mut self, record: &TimestampedText, reducer: &R) -> WindowUpdate {
        if record.is_control() {
            self.reset();
            return WindowUpdate::Reset;
        }

        match parse_sample(&record.text) {
            Some(value) => self.push(TimestampedValue::new(record.timestamp, value), reducer),
            None => WindowUpdate::Rejected,
        }
    }

    /// Store a parsed sample
    pub fn push<R: Reducer + ?Sized>(&mut self, sample: TimestampedValue, reducer: &R) -> WindowUpdate {
        self.current_raw = sample;
        self.raw_legit = true;

        let was_full = self.is_full();
        self.samples.push_front(sample);
        if was_full {
            self.samples.pop_back();
        }

        if !self.is_full() {
            return WindowUpdate::Filling {
                len: self.samples.len(),
            };
        }

        let values: Vec<f64> = self.samples.iter().map(|s| s.value).collect();
        self.current_processed = TimestampedValue::new(
            self.samples[self.radius].timestamp,
            reducer.reduce(&values),
        );
        self.processed_legit = true;

        WindowUpdate::Processed(self.current_processed)
    }
}

/// Parse the number a sample text starts with.
///
/// Leading whitespace is skipped and anything after the number is ignored, so a
/// frame cut through a line stream (`"23.5\r\n24"`) still yields 23.5. Texts
/// without a leading number and out-of-range values are rejected.
pub fn parse_sample(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let len = float_prefix_len(text.as_bytes());
    if len == 0 {
        return None;
    }
    text[..len].parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Length of the longest prefix of `bytes` of the form `[+-]digits[.digits][e[+-]digits]`
fn float_prefix_len(bytes: &[u8]) -> usize {
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut pos = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }

    let integer = digits_from(pos);
    pos += integer;
    let mut fraction = 0;
    if bytes.get(pos) == Some(&b'.') {
        fraction = digits_from(pos + 1);
        if integer > 0 || fraction > 0 {
            pos += 1 + fraction;
        }
    }
    if integer == 0 && fraction == 0 {
        return 0;
    }

    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut exp = pos + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exponent = digits_from(exp);
        if exponent > 0 {
            pos = exp + exponent;
        }
    }
    pos
}
