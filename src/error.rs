//! Error types for the spectral-despike library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum DespikeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("Invalid threshold {0}: must be finite and positive")]
    InvalidThreshold(f64),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Interpolation failed{}: {reason}", at_index(.index))]
    InterpolationFailure { index: Option<usize>, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DespikeError {
    /// Shorthand for an interpolation failure tied to a sample position.
    pub fn interpolation_at(index: usize, reason: impl Into<String>) -> Self {
        Self::InterpolationFailure {
            index: Some(index),
            reason: reason.into(),
        }
    }
}

fn at_index(index: &Option<usize>) -> String {
    index.map(|i| format!(" at index {}", i)).unwrap_or_default()
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, DespikeError>;
