//! Core data models for threshold generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped observation of a metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Samples for one metric over one lookback window, ordered by timestamp
pub type SampleSeries = Vec<Sample>;

/// Unit category of a metric, governs clamping of derived thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Percentage,
    Count,
    Rate,
    Duration,
    Bytes,
    Ratio,
    /// Any kind not listed above; thresholds are left unclamped
    #[serde(other)]
    Other,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Percentage => write!(f, "percentage"),
            ValueKind::Count => write!(f, "count"),
            ValueKind::Rate => write!(f, "rate"),
            ValueKind::Duration => write!(f, "duration"),
            ValueKind::Bytes => write!(f, "bytes"),
            ValueKind::Ratio => write!(f, "ratio"),
            ValueKind::Other => write!(f, "other"),
        }
    }
}

/// Which side of the distribution indicates degradation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Larger values are worse; thresholds are ceilings
    Upper,
    /// Smaller values are worse; thresholds are floors
    Lower,
}

impl Direction {
    /// PromQL comparison operator that fires on the bad side
    pub fn operator(&self) -> &'static str {
        match self {
            Direction::Upper => ">",
            Direction::Lower => "<",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Upper => write!(f, "upper"),
            Direction::Lower => write!(f, "lower"),
        }
    }
}

/// Static per-metric descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricShape {
    #[serde(rename = "type", alias = "value_kind")]
    pub value_kind: ValueKind,
    pub direction: Direction,
}

impl MetricShape {
    pub fn new(value_kind: ValueKind, direction: Direction) -> Self {
        Self {
            value_kind,
            direction,
        }
    }
}

/// A tracked metric: its name, the PromQL query that produces it, and its shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    pub query: String,
    #[serde(flatten)]
    pub shape: MetricShape,
}

impl MetricDefinition {
    pub fn new(
        name: impl Into<String>,
        query: impl Into<String>,
        value_kind: ValueKind,
        direction: Direction,
    ) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            shape: MetricShape::new(value_kind, direction),
        }
    }
}

/// Statistical summary of one metric over one window
///
/// Summaries built from fewer than three samples carry only the synthesized
/// fields; the interquartile percentiles and median are left out rather than
/// zeroed so that "not computed" stays distinguishable from "computed as 0".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p25: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p75: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p90: Option<f64>,
    pub p95: f64,
    pub p99: f64,
    pub data_points: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub insufficient_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_outliers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_detected: Option<bool>,
}

/// Warning and critical breakpoints for one metric
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub warning: f64,
    pub critical: f64,
}

impl ThresholdPair {
    /// The "no threshold could be derived" sentinel
    pub const UNAVAILABLE: ThresholdPair = ThresholdPair {
        warning: 0.0,
        critical: 0.0,
    };

    pub fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    pub fn is_unavailable(&self) -> bool {
        *self == Self::UNAVAILABLE
    }

    /// Whether critical is at least as severe as warning for the direction.
    ///
    /// The deriver does not enforce this; callers use it to report inverted pairs.
    pub fn is_ordered(&self, direction: Direction) -> bool {
        match direction {
            Direction::Upper => self.critical >= self.warning,
            Direction::Lower => self.critical <= self.warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_deserializes_to_other() {
        let shape: MetricShape =
            serde_json::from_str(r#"{"type": "temperature", "direction": "upper"}"#).unwrap();
        assert_eq!(shape.value_kind, ValueKind::Other);
        assert_eq!(shape.direction, Direction::Upper);
    }

    #[test]
    fn test_metric_definition_flattens_shape() {
        let def: MetricDefinition = serde_json::from_str(
            r#"{"name": "hit_rate", "query": "hits / total", "type": "percentage", "direction": "lower"}"#,
        )
        .unwrap();
        assert_eq!(def.shape.value_kind, ValueKind::Percentage);
        assert_eq!(def.shape.direction, Direction::Lower);
        assert_eq!(def.shape.direction.operator(), "<");
    }

    #[test]
    fn test_insufficient_summary_omits_absent_fields() {
        let summary = FeatureSummary {
            mean: 5.0,
            std: 1.0,
            min: 5.0,
            max: 5.0,
            median: None,
            p25: None,
            p75: None,
            p90: None,
            p95: 6.0,
            p99: 7.0,
            data_points: 1,
            insufficient_data: true,
            has_outliers: None,
            anomaly_detected: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("p25"));
        assert!(!obj.contains_key("median"));
        assert!(!obj.contains_key("has_outliers"));
        assert_eq!(obj["insufficient_data"], true);
        assert_eq!(obj.len(), 8);
    }

    #[test]
    fn test_threshold_ordering() {
        let pair = ThresholdPair::new(80.0, 75.0);
        assert!(pair.is_ordered(Direction::Lower));
        assert!(!pair.is_ordered(Direction::Upper));
        assert!(ThresholdPair::UNAVAILABLE.is_unavailable());
    }
}
