//! Distribution analysis for metric sample series
//!
//! Turns a raw series into a [`FeatureSummary`]: central tendency, spread,
//! percentiles, and the outlier/anomaly flags. Behaviour branches on the
//! number of usable samples:
//! - none: no summary
//! - fewer than [`MIN_SAMPLES_FOR_STATS`]: spread and tail synthesized from the first value
//! - at least [`MIN_SAMPLES_FOR_OUTLIERS`]: isolation forest outlier flag
//! - at least [`MIN_SAMPLES_FOR_ANOMALIES`]: DBSCAN anomaly flag

pub mod stats;

use tracing::debug;

use crate::anomaly::{standardize, Dbscan, DetectorError, IsolationForest};
use crate::models::{FeatureSummary, Sample};

/// Minimum samples for real descriptive statistics
pub const MIN_SAMPLES_FOR_STATS: usize = 3;

/// Minimum samples before running outlier detection
pub const MIN_SAMPLES_FOR_OUTLIERS: usize = 10;

/// Minimum samples before running density-based anomaly detection
pub const MIN_SAMPLES_FOR_ANOMALIES: usize = 20;

/// Expected outlier fraction for the isolation forest
pub const OUTLIER_CONTAMINATION: f64 = 0.1;

/// DBSCAN radius in standardized units
pub const ANOMALY_EPS: f64 = 0.5;

/// DBSCAN neighbours required for a dense region
pub const ANOMALY_MIN_SAMPLES: usize = 5;

/// Spread synthesized for sparse data, as a fraction of the observed value
const SPARSE_STD_FRACTION: f64 = 0.1;

/// Lower bound for the synthesized spread
const SPARSE_STD_FLOOR: f64 = 1.0;

/// Headroom multipliers for synthesized tail percentiles
const SPARSE_P95_FACTOR: f64 = 1.2;
const SPARSE_P99_FACTOR: f64 = 1.4;

/// Analyze a sample series.
///
/// Non-finite values are dropped first. Returns `None` when nothing usable
/// remains, in which case no threshold can be derived.
pub fn analyze(series: &[Sample]) -> Option<FeatureSummary> {
    let values: Vec<f64> = series
        .iter()
        .map(|s| s.value)
        .filter(|v| v.is_finite())
        .collect();

    let dropped = series.len() - values.len();
    if dropped > 0 {
        debug!(dropped, "Discarded non-finite samples before analysis");
    }

    analyze_values(&values)
}

/// Analyze plain values; all of them must be finite.
pub fn analyze_values(values: &[f64]) -> Option<FeatureSummary> {
    if values.is_empty() {
        return None;
    }
    if values.len() < MIN_SAMPLES_FOR_STATS {
        return Some(sparse_summary(values));
    }

    let sorted = stats::sorted(values);
    let pct = |p: f64| stats::percentile_sorted(&sorted, p);

    let mut summary = FeatureSummary {
        mean: stats::mean(values),
        std: stats::std_dev(values),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median: Some(pct(50.0)),
        p25: Some(pct(25.0)),
        p75: Some(pct(75.0)),
        p90: Some(pct(90.0)),
        p95: pct(95.0),
        p99: pct(99.0),
        data_points: values.len(),
        insufficient_data: false,
        has_outliers: None,
        anomaly_detected: None,
    };

    if values.len() >= MIN_SAMPLES_FOR_OUTLIERS {
        summary.has_outliers = flag("outlier", detect_outliers(values));
    }
    if values.len() >= MIN_SAMPLES_FOR_ANOMALIES {
        summary.anomaly_detected = flag("anomaly", detect_anomalies(values));
    }

    Some(summary)
}

/// Summary for one or two samples, built from the first value alone
fn sparse_summary(values: &[f64]) -> FeatureSummary {
    let current = values[0];
    FeatureSummary {
        mean: current,
        std: (current * SPARSE_STD_FRACTION).max(SPARSE_STD_FLOOR),
        min: current,
        max: current,
        median: None,
        p25: None,
        p75: None,
        p90: None,
        p95: current * SPARSE_P95_FACTOR,
        p99: current * SPARSE_P99_FACTOR,
        data_points: values.len(),
        insufficient_data: true,
        has_outliers: None,
        anomaly_detected: None,
    }
}

fn detect_outliers(values: &[f64]) -> Result<bool, DetectorError> {
    IsolationForest::new(OUTLIER_CONTAMINATION).has_outliers(values)
}

fn detect_anomalies(values: &[f64]) -> Result<bool, DetectorError> {
    let scaled = standardize(values)?;
    Dbscan::new(ANOMALY_EPS, ANOMALY_MIN_SAMPLES).has_noise(&scaled)
}

fn flag(detector: &str, result: Result<bool, DetectorError>) -> Option<bool> {
    match result {
        Ok(found) => Some(found),
        Err(e) => {
            debug!(detector = %detector, error = %e, "Advanced analysis failed");
            None
        }
    }
}
