// Frame sources feeding the reader
//
// A source hands out fixed-size frames through a blocking `read_frame` call.
// New sources are added by:
// 1. Implementing the FrameSource trait
// 2. Adding a variant to SourceConfig
// 3. Constructing it in `open_source`
//
// Current implementations:
// - Serial: serial port connections (e.g., Arduino boards sending fixed-width readings)
// - File: replays a recorded capture frame by frame

mod file;
mod serial;

use crate::error::{SourceError, SourceResult};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read};
use std::time::Duration;

pub use file::FileFrameSource;
pub use serial::{list_ports, PortInfo, SerialFrameSource};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Configuration for the supported source types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceConfig {
    /// Serial port connection (e.g., /dev/ttyACM0 on Linux, COM3 on Windows)
    #[serde(rename = "serial")]
    SerialPort {
        port: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        /// Size in bytes of every message the device sends
        frame_size: usize,
        #[serde(default)]
        data_bits: Option<u8>,
        #[serde(default)]
        stop_bits: Option<u8>,
        /// A frame that does not complete within this time is a read failure
        #[serde(default)]
        read_timeout_ms: Option<u64>,
    },

    /// Recorded capture replayed as consecutive frames
    #[serde(rename = "file")]
    FileStream {
        path: String,
        frame_size: usize,
        /// Delay before each frame in milliseconds
        #[serde(default)]
        rate_limit_ms: Option<u64>,
        /// Start over at end of file instead of failing
        #[serde(default)]
        loop_playback: bool,
    },
}

impl SourceConfig {
    /// Serial port at the default baud rate
    pub fn serial(port: impl Into<String>, frame_size: usize) -> Self {
        SourceConfig::SerialPort {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            frame_size,
            data_bits: None,
            stop_bits: None,
            read_timeout_ms: None,
        }
    }

    pub fn file(path: impl Into<String>, frame_size: usize) -> Self {
        SourceConfig::FileStream {
            path: path.into(),
            frame_size,
            rate_limit_ms: None,
            loop_playback: false,
        }
    }

    pub fn frame_size(&self) -> usize {
        match self {
            SourceConfig::SerialPort { frame_size, .. } => *frame_size,
            SourceConfig::FileStream { frame_size, .. } => *frame_size,
        }
    }

    /// Port name or file path
    pub fn identifier(&self) -> &str {
        match self {
            SourceConfig::SerialPort { port, .. } => port,
            SourceConfig::FileStream { path, .. } => path,
        }
    }

    pub fn validate(&self) -> SourceResult<()> {
        if self.frame_size() == 0 {
            return Err(SourceError::InvalidConfig(
                "frame_size must be greater than zero".to_string(),
            ));
        }
        if self.identifier().is_empty() {
            return Err(SourceError::InvalidConfig(
                "source identifier must not be empty".to_string(),
            ));
        }

        if let SourceConfig::SerialPort {
            baud_rate,
            data_bits,
            stop_bits,
            ..
        } = self
        {
            if *baud_rate == 0 {
                return Err(SourceError::InvalidConfig(
                    "baud_rate must be greater than zero".to_string(),
                ));
            }
            if let Some(bits) = data_bits {
                if !(5..=8).contains(bits) {
                    return Err(SourceError::InvalidConfig(format!(
                        "data_bits must be between 5 and 8, got {}",
                        bits
                    )));
                }
            }
            if let Some(bits) = stop_bits {
                if *bits != 1 && *bits != 2 {
                    return Err(SourceError::InvalidConfig(format!(
                        "stop_bits must be 1 or 2, got {}",
                        bits
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Blocking producer of fixed-size frames.
///
/// `read_frame` returns exactly `frame_size()` bytes or an error. A short
/// frame is an error like any other: the reader does not try to resync.
pub trait FrameSource: Send {
    fn read_frame(&mut self) -> SourceResult<Vec<u8>>;

    fn frame_size(&self) -> usize;

    /// Human readable identification for logs
    fn describe(&self) -> String;
}

/// Open the source described by `config`
pub fn open_source(config: &SourceConfig) -> SourceResult<Box<dyn FrameSource>> {
    config.validate()?;

    match config {
        SourceConfig::SerialPort {
            port,
            baud_rate,
            frame_size,
            data_bits,
            stop_bits,
            read_timeout_ms,
        } => Ok(Box::new(SerialFrameSource::open(
            port,
            *baud_rate,
            *frame_size,
            *data_bits,
            *stop_bits,
            Duration::from_millis(read_timeout_ms.unwrap_or(DEFAULT_READ_TIMEOUT_MS)),
        )?)),

        SourceConfig::FileStream {
            path,
            frame_size,
            rate_limit_ms,
            loop_playback,
        } => Ok(Box::new(FileFrameSource::open(
            path,
            *frame_size,
            rate_limit_ms.map(Duration::from_millis),
            *loop_playback,
        )?)),
    }
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF
pub(crate) fn fill_frame<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
