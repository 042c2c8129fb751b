//! Threshold derivation from a feature summary
//!
//! Upper-direction metrics take the larger of a sigma band and the matching
//! tail percentile, then clamp per value kind. Lower-direction metrics use a
//! sigma band below the mean with fixed operational floors.

use crate::models::{Direction, FeatureSummary, MetricShape, ThresholdPair, ValueKind};

/// Percentage ceilings
const PERCENTAGE_WARNING_MAX: f64 = 85.0;
const PERCENTAGE_CRITICAL_MAX: f64 = 95.0;

/// Minimum alerting bar for ratios
const RATIO_WARNING_MIN: f64 = 2.0;
const RATIO_CRITICAL_MIN: f64 = 3.0;

/// Duration ceilings, in seconds
const DURATION_WARNING_MAX: f64 = 1.0;
const DURATION_CRITICAL_MAX: f64 = 5.0;

/// Floors for metrics where lower values are worse
const LOWER_WARNING_FLOOR: f64 = 70.0;
const LOWER_CRITICAL_FLOOR: f64 = 50.0;

/// Sigma multipliers for warning and critical bands
const WARNING_SIGMAS: f64 = 2.0;
const CRITICAL_SIGMAS: f64 = 3.0;

/// Derive warning/critical thresholds for a metric.
///
/// Absent features yield [`ThresholdPair::UNAVAILABLE`]. Both values are
/// clamped to be non-negative and rounded to two decimals. Critical is not
/// forced to be more severe than warning.
pub fn derive_thresholds(shape: &MetricShape, features: Option<&FeatureSummary>) -> ThresholdPair {
    let Some(f) = features else {
        return ThresholdPair::UNAVAILABLE;
    };

    let (warning, critical) = match shape.direction {
        Direction::Upper => {
            let warning = (f.mean + WARNING_SIGMAS * f.std).max(f.p95);
            let critical = (f.mean + CRITICAL_SIGMAS * f.std).max(f.p99);
            match shape.value_kind {
                ValueKind::Percentage => (
                    warning.min(PERCENTAGE_WARNING_MAX),
                    critical.min(PERCENTAGE_CRITICAL_MAX),
                ),
                ValueKind::Ratio => (
                    warning.max(RATIO_WARNING_MIN),
                    critical.max(RATIO_CRITICAL_MIN),
                ),
                ValueKind::Duration => (
                    warning.min(DURATION_WARNING_MAX),
                    critical.min(DURATION_CRITICAL_MAX),
                ),
                ValueKind::Count | ValueKind::Rate | ValueKind::Bytes | ValueKind::Other => {
                    (warning, critical)
                }
            }
        }
        Direction::Lower => (
            (f.mean - WARNING_SIGMAS * f.std).max(LOWER_WARNING_FLOOR),
            (f.mean - CRITICAL_SIGMAS * f.std).max(LOWER_CRITICAL_FLOOR),
        ),
    };

    ThresholdPair::new(finalize(warning), finalize(critical))
}

fn finalize(value: f64) -> f64 {
    round2(value.max(0.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
