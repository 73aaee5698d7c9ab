// Monitor configuration
//
// Describes one source, the analyzers attached to it and how often their
// outputs are drained to files. Loaded from JSON, e.g.:
//
// {
//   "source": { "type": "serial", "port": "COM3", "frame_size": 10 },
//   "analyzers": [
//     { "kind": "median", "radius": 2 },
//     { "kind": "mean", "radius": 2, "output": "average.txt" }
//   ],
//   "poll_interval_ms": 500
// }

use crate::error::{ConfigError, ConfigResult};
use crate::reducer::ReducerKind;
use crate::source::SourceConfig;
use crate::window::check_radius;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_RAW_OUTPUT: &str = "RawData.txt";

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_raw_output() -> String {
    DEFAULT_RAW_OUTPUT.to_string()
}

/// One analyzer to attach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSpec {
    pub kind: ReducerKind,
    /// Half width k; the window holds 2k+1 samples
    pub radius: usize,
    /// Output file name, relative to the output directory
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub source: SourceConfig,

    #[serde(default)]
    pub analyzers: Vec<AnalyzerSpec>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File receiving the raw stream
    #[serde(default = "default_raw_output")]
    pub raw_output: String,

    /// Stop after this many seconds
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::serial("COM3", 10),
            analyzers: vec![
                AnalyzerSpec {
                    kind: ReducerKind::Median,
                    radius: 2,
                    output: None,
                },
                AnalyzerSpec {
                    kind: ReducerKind::Mean,
                    radius: 2,
                    output: None,
                },
            ],
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            output_dir: default_output_dir(),
            raw_output: default_raw_output(),
            duration_secs: None,
        }
    }
}

impl MonitorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: MonitorConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.source.validate()?;

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.raw_output.is_empty() {
            return Err(ConfigError::Invalid("raw_output must not be empty".to_string()));
        }

        let mut outputs = vec![self.raw_output.clone()];
        for (index, spec) in self.analyzers.iter().enumerate() {
            check_radius(spec.radius).map_err(|e| {
                ConfigError::Invalid(format!("analyzer {} ({}): {}", index, spec.kind.name(), e))
            })?;

            let output = self.output_name(index);
            if outputs.contains(&output) {
                return Err(ConfigError::Invalid(format!(
                    "output file {} is used more than once",
                    output
                )));
            }
            outputs.push(output);
        }

        Ok(())
    }

    /// Output file name of analyzer `index`.
    ///
    /// Defaults to `<FilterName>.txt`; repeated kinds get the index appended.
    pub fn output_name(&self, index: usize) -> String {
        let spec = &self.analyzers[index];
        if let Some(output) = &spec.output {
            return output.clone();
        }

        let repeated = self
            .analyzers
            .iter()
            .filter(|other| other.kind == spec.kind && other.output.is_none())
            .count()
            > 1;
        if repeated {
            format!("{}_{}.txt", spec.kind.name(), index)
        } else {
            format!("{}.txt", spec.kind.name())
        }
    }

    pub fn output_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(self.output_name(index))
    }

    pub fn raw_output_path(&self) -> PathBuf {
        self.output_dir.join(&self.raw_output)
    }
}
