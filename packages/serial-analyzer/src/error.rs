use thiserror::Error;

/// Errors raised while opening or reading a frame source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open source {0}: {1}")]
    Open(String, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short frame: expected {expected} bytes, got {actual}")]
    ShortFrame { expected: usize, actual: usize },

    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("Invalid source configuration: {0}")]
    InvalidConfig(String),
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Errors raised while loading a monitor configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl From<SourceError> for ConfigError {
    fn from(err: SourceError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}
