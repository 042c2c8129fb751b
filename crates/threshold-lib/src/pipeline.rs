//! Per-metric fetch → analyze → derive pipeline
//!
//! Each metric is processed on its own tokio task. Analysis and derivation
//! are pure, so running metrics concurrently does not change results; the
//! output keeps the order of the input definitions.

use std::sync::Arc;
use std::time::Instant;

use tracing::error;

use crate::analyzer::analyze;
use crate::deriver::derive_thresholds;
use crate::models::MetricDefinition;
use crate::observability::{GeneratorMetrics, StructuredLogger};
use crate::report::MetricResult;
use crate::source::{fetch_with_fallback, SampleSource};

/// Default lookback for the first query window
pub const DEFAULT_LOOKBACK_DAYS: u32 = 28;

/// Runs the threshold pipeline for a set of metric definitions
#[derive(Clone)]
pub struct ThresholdGenerator {
    source: Arc<dyn SampleSource>,
    lookback_days: u32,
    metrics: GeneratorMetrics,
    logger: StructuredLogger,
}

impl ThresholdGenerator {
    pub fn new(source: Arc<dyn SampleSource>, logger: StructuredLogger) -> Self {
        Self {
            source,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            metrics: GeneratorMetrics::new(),
            logger,
        }
    }

    pub fn with_lookback_days(mut self, lookback_days: u32) -> Self {
        self.lookback_days = lookback_days;
        self
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    /// Process one metric
    pub async fn process(&self, definition: &MetricDefinition) -> MetricResult {
        let fetch_start = Instant::now();
        let (series, window) =
            fetch_with_fallback(self.source.as_ref(), &definition.query, self.lookback_days).await;
        self.metrics
            .observe_fetch_latency(fetch_start.elapsed().as_secs_f64());
        self.metrics.record_window(window);
        self.logger.log_fetch(&definition.name, window, series.len());

        let analysis_start = Instant::now();
        let features = analyze(&series);
        let thresholds = derive_thresholds(&definition.shape, features.as_ref());
        self.metrics
            .observe_analysis_latency(analysis_start.elapsed().as_secs_f64());

        self.metrics
            .record_result(&definition.shape, features.as_ref(), &thresholds);
        self.logger.log_thresholds(
            &definition.name,
            &definition.shape,
            features.as_ref(),
            &thresholds,
        );

        MetricResult {
            definition: definition.clone(),
            window,
            features,
            thresholds,
        }
    }

    /// Process all metrics concurrently, returning results in input order
    pub async fn run(&self, definitions: &[MetricDefinition]) -> Vec<MetricResult> {
        let handles: Vec<_> = definitions
            .iter()
            .cloned()
            .map(|definition| {
                let generator = self.clone();
                tokio::spawn(async move { generator.process(&definition).await })
            })
            .collect();

        let mut results = Vec::with_capacity(definitions.len());
        for (definition, handle) in definitions.iter().zip(handles) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(metric = %definition.name, error = %e, "Metric task failed");
                    results.push(MetricResult::unavailable(definition.clone()));
                }
            }
        }
        results
    }
}
