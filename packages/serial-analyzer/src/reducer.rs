//! Reduction strategies that turn a full analyzer window into one value.

use serde::{Deserialize, Serialize};

/// Converts the `2k+1` values of a full window into the processed value.
///
/// `values` is ordered newest first and always has odd length.
pub trait Reducer: Send + Sync + 'static {
    fn reduce(&self, values: &[f64]) -> f64;

    /// Name used for logs and default output file names
    fn name(&self) -> &'static str;
}

impl<R: Reducer + ?Sized> Reducer for Box<R> {
    fn reduce(&self, values: &[f64]) -> f64 {
        (**self).reduce(values)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Middle element of the sorted window
#[derive(Debug, Clone, Copy, Default)]
pub struct Median;

impl Reducer for Median {
    fn reduce(&self, values: &[f64]) -> f64 {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted[sorted.len() / 2]
    }

    fn name(&self) -> &'static str {
        "MedianFilter"
    }
}

/// Arithmetic mean of the window
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean;

impl Reducer for Mean {
    fn reduce(&self, values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn name(&self) -> &'static str {
        "MovingAverageFilter"
    }
}

/// Reducer selection for configuration files and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReducerKind {
    Median,
    Mean,
}

impl ReducerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ReducerKind::Median => Median.name(),
            ReducerKind::Mean => Mean.name(),
        }
    }

    pub fn reducer(&self) -> Box<dyn Reducer> {
        match self {
            ReducerKind::Median => Box::new(Median),
            ReducerKind::Mean => Box::new(Mean),
        }
    }
}

impl std::str::FromStr for ReducerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "median" => Ok(ReducerKind::Median),
            "mean" | "average" | "moving-average" => Ok(ReducerKind::Mean),
            other => Err(format!("unknown reducer '{}', expected median or mean", other)),
        }
    }
}
