//! Crate-wide error type.
//!
//! Every fallible operation returns `Result<_, FitError>`. Errors are local to a
//! single fit call: batch drivers are expected to record them and move on.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Unknown model tag or an invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller violated an input precondition (empty, non-finite or non-positive dwells).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No observed dwells remain after applying the censoring/truncation thresholds.
    #[error("no observed dwells left below Tmax={tmax} (tcut={tcut}, {total} dwells supplied)")]
    InsufficientData { tmax: f64, tcut: f64, total: usize },

    /// The fit was cancelled between annealing runs or bootstrap replicates.
    #[error("fit cancelled")]
    Cancelled,
}

impl FitError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Whether a batch driver should skip this dataset rather than treat it as a
    /// caller bug.
    pub fn is_data_dependent(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::InvalidInput(_))
    }
}
