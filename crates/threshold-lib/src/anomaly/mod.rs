//! Unsupervised detectors over one-dimensional metric values
//!
//! This module provides:
//! - Outlier detection with an isolation forest (points isolated in few splits)
//! - Density-based anomaly detection with DBSCAN (points outside any dense cluster)
//!
//! Detectors report failures through [`DetectorError`]; the analyzer turns
//! those into absent flags instead of aborting the analysis.

mod dbscan;
mod isolation_forest;

pub use dbscan::{standardize, Dbscan};
pub use isolation_forest::IsolationForest;

/// Failure inside a detector
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectorError {
    #[error("detector needs at least {required} samples, got {actual}")]
    TooFewSamples { required: usize, actual: usize },

    #[error("input contains non-finite values")]
    NonFiniteInput,

    #[error("detector produced non-finite scores")]
    NonFiniteScore,
}

pub(crate) fn ensure_finite(values: &[f64]) -> Result<(), DetectorError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(DetectorError::NonFiniteInput)
    }
}
