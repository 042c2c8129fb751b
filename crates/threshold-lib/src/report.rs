//! Run report assembly
//!
//! Collects per-metric results in registry order and produces the analysis
//! document and alert rule file persisted by the generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{FeatureSummary, MetricDefinition, ThresholdPair};
use crate::rules::{self, RuleFile, RuleOptions};
use crate::source::FetchWindow;

/// Outcome of the fetch, analyze and derive steps for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub definition: MetricDefinition,
    /// Window that produced the samples, `None` when all were empty
    pub window: Option<FetchWindow>,
    pub features: Option<FeatureSummary>,
    pub thresholds: ThresholdPair,
}

impl MetricResult {
    /// Result for a metric that could not be processed at all
    pub fn unavailable(definition: MetricDefinition) -> Self {
        Self {
            definition,
            window: None,
            features: None,
            thresholds: ThresholdPair::UNAVAILABLE,
        }
    }
}

/// Everything produced by one generator run
#[derive(Debug, Clone)]
pub struct ThresholdReport {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<MetricResult>,
    pub alert_rules: RuleFile,
}

/// Serializable analysis document, keyed by metric name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDocument {
    pub thresholds: BTreeMap<String, ThresholdPair>,
    pub analysis: BTreeMap<String, Option<FeatureSummary>>,
    pub windows: BTreeMap<String, Option<FetchWindow>>,
    pub working_metrics: BTreeMap<String, String>,
    pub generated_at: DateTime<Utc>,
}

impl ThresholdReport {
    /// Build a report and render alert rules from the results
    pub fn new(results: Vec<MetricResult>, rule_options: &RuleOptions) -> Self {
        let alert_rules = rules::render(
            results.iter().map(|r| (&r.definition, &r.thresholds)),
            rule_options,
        );
        Self {
            generated_at: Utc::now(),
            results,
            alert_rules,
        }
    }

    /// Metrics for which no threshold could be derived
    pub fn unavailable(&self) -> impl Iterator<Item = &MetricResult> {
        self.results.iter().filter(|r| r.thresholds.is_unavailable())
    }

    pub fn analysis_document(&self) -> AnalysisDocument {
        let mut doc = AnalysisDocument {
            thresholds: BTreeMap::new(),
            analysis: BTreeMap::new(),
            windows: BTreeMap::new(),
            working_metrics: BTreeMap::new(),
            generated_at: self.generated_at,
        };
        for r in &self.results {
            let name = r.definition.name.clone();
            doc.thresholds.insert(name.clone(), r.thresholds);
            doc.analysis.insert(name.clone(), r.features.clone());
            doc.windows.insert(name.clone(), r.window);
            doc.working_metrics.insert(name, r.definition.query.clone());
        }
        doc
    }
}
