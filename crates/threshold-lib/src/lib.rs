//! Threshold library for statistically derived alerting rules
//!
//! This crate provides the core functionality for:
//! - Fetching metric history from Prometheus with a window fallback cascade
//! - Distribution analysis with outlier and anomaly flags
//! - Unit-aware warning/critical threshold derivation
//! - Prometheus alert rule rendering and run reports
//! - Observability

pub mod analyzer;
pub mod anomaly;
pub mod deriver;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod rules;
pub mod source;

pub use analyzer::analyze;
pub use deriver::derive_thresholds;
pub use models::*;
pub use observability::{GeneratorMetrics, StructuredLogger};
pub use pipeline::ThresholdGenerator;
pub use report::{AnalysisDocument, MetricResult, ThresholdReport};
pub use rules::{RuleFile, RuleOptions};
pub use source::{fetch_with_fallback, FetchWindow, PrometheusSource, SampleSource, SourceError};
