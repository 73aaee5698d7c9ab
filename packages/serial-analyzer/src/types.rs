// Common types shared by the reader, the dispatcher and the analyzers

use serde::{Deserialize, Serialize};

/// Timestamp used by control records and by values that are not available yet
pub const NO_TIMESTAMP: i64 = -1;

/// Control texts the reader publishes instead of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlState {
    /// Source opened, nothing read yet
    Initializing,
    /// A read failed; the reader is permanently inactive
    Error,
    /// The reader was shut down
    Closed,
}

impl ControlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlState::Initializing => "INITIALIZING",
            ControlState::Error => "ERROR",
            ControlState::Closed => "CLOSED",
        }
    }

    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "INITIALIZING" => Some(ControlState::Initializing),
            "ERROR" => Some(ControlState::Error),
            "CLOSED" => Some(ControlState::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record published by the reader: either a sample text or a control text.
///
/// Sample records carry the wall-clock second at which the frame was read,
/// control records carry [`NO_TIMESTAMP`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedText {
    pub timestamp: i64,
    pub text: String,
}

impl TimestampedText {
    pub fn new(timestamp: i64, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }

    /// A sample record stamped with the current time
    pub fn now(text: impl Into<String>) -> Self {
        Self::new(chrono::Utc::now().timestamp(), text)
    }

    pub fn control(state: ControlState) -> Self {
        Self::new(NO_TIMESTAMP, state.as_str())
    }

    /// The control state this record signals, if any
    pub fn control_state(&self) -> Option<ControlState> {
        ControlState::from_text(&self.text)
    }

    pub fn is_control(&self) -> bool {
        self.control_state().is_some()
    }
}

/// A raw or processed reading as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestampedValue {
    pub timestamp: i64,
    pub value: f64,
}

impl TimestampedValue {
    /// `(-1, 0)`: the reading is not available
    pub const SENTINEL: TimestampedValue = TimestampedValue {
        timestamp: NO_TIMESTAMP,
        value: 0.0,
    };

    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn is_sentinel(&self) -> bool {
        self.timestamp == NO_TIMESTAMP
    }

    /// `None` for the sentinel
    pub fn available(self) -> Option<Self> {
        if self.is_sentinel() {
            None
        } else {
            Some(self)
        }
    }
}

impl Default for TimestampedValue {
    fn default() -> Self {
        Self::SENTINEL
    }
}

/// Counters collected by a running reader
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderStats {
    /// Complete frames read from the source
    pub frames_read: u64,
    /// Records handed to the dispatcher, control records included
    pub records_published: u64,
    /// Individual `fetch_new_data` calls made by the dispatcher
    pub deliveries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_records_use_sentinel_timestamp() {
        for state in [
            ControlState::Initializing,
            ControlState::Error,
            ControlState::Closed,
        ] {
            let record = TimestampedText::control(state);
            assert_eq!(record.timestamp, NO_TIMESTAMP);
            assert_eq!(record.control_state(), Some(state));
        }
    }

    #[test]
    fn test_numeric_text_is_not_control() {
        let record = TimestampedText::new(1_600_000_000, "23.5");
        assert!(!record.is_control());
        // control texts are matched exactly
        assert!(!TimestampedText::new(5, "error").is_control());
    }

    #[test]
    fn test_sentinel() {
        assert!(TimestampedValue::SENTINEL.is_sentinel());
        assert_eq!(TimestampedValue::default(), TimestampedValue::new(-1, 0.0));
        assert!(TimestampedValue::SENTINEL.available().is_none());
        assert_eq!(
            TimestampedValue::new(10, 1.5).available(),
            Some(TimestampedValue::new(10, 1.5))
        );
    }

    #[test]
    fn test_control_state_serializes_as_wire_text() {
        let json = serde_json::to_string(&ControlState::Initializing).unwrap();
        assert_eq!(json, "\"INITIALIZING\"");
    }
}
