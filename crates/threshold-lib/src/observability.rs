//! Observability infrastructure for threshold generation
//!
//! Provides:
//! - Prometheus metrics (fetch latency, analysis latency, window usage, detector flags)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::models::{FeatureSummary, MetricShape, ThresholdPair};
use crate::source::FetchWindow;

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<GeneratorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct GeneratorMetricsInner {
    fetch_latency_seconds: Histogram,
    analysis_latency_seconds: Histogram,
    metrics_processed: IntCounter,
    fetch_windows: IntCounterVec,
    insufficient_data: IntCounter,
    outliers_flagged: IntCounter,
    anomalies_flagged: IntCounter,
    thresholds_unavailable: IntCounter,
    thresholds_inverted: IntCounter,
}

impl GeneratorMetricsInner {
    fn new() -> Self {
        Self {
            fetch_latency_seconds: register_histogram!(
                "threshold_generator_fetch_latency_seconds",
                "Time spent fetching samples for one metric, across fallback windows",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            analysis_latency_seconds: register_histogram!(
                "threshold_generator_analysis_latency_seconds",
                "Time spent analyzing samples and deriving thresholds for one metric",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register analysis_latency_seconds"),

            metrics_processed: register_int_counter!(
                "threshold_generator_metrics_processed_total",
                "Total number of metrics processed"
            )
            .expect("Failed to register metrics_processed"),

            fetch_windows: register_int_counter_vec!(
                "threshold_generator_fetch_windows_total",
                "Query window that produced the samples for a metric",
                &["window"]
            )
            .expect("Failed to register fetch_windows"),

            insufficient_data: register_int_counter!(
                "threshold_generator_insufficient_data_total",
                "Summaries built from too few samples for real variance estimates"
            )
            .expect("Failed to register insufficient_data"),

            outliers_flagged: register_int_counter!(
                "threshold_generator_outliers_flagged_total",
                "Metrics whose window contained isolation-forest outliers"
            )
            .expect("Failed to register outliers_flagged"),

            anomalies_flagged: register_int_counter!(
                "threshold_generator_anomalies_flagged_total",
                "Metrics whose window contained density-based anomalies"
            )
            .expect("Failed to register anomalies_flagged"),

            thresholds_unavailable: register_int_counter!(
                "threshold_generator_thresholds_unavailable_total",
                "Metrics for which no threshold could be derived"
            )
            .expect("Failed to register thresholds_unavailable"),

            thresholds_inverted: register_int_counter!(
                "threshold_generator_thresholds_inverted_total",
                "Threshold pairs whose critical level is less severe than warning"
            )
            .expect("Failed to register thresholds_inverted"),
        }
    }
}

/// Generator metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct GeneratorMetrics {
    _private: (),
}

impl Default for GeneratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(GeneratorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &GeneratorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_latency_seconds.observe(duration_secs);
    }

    pub fn observe_analysis_latency(&self, duration_secs: f64) {
        self.inner().analysis_latency_seconds.observe(duration_secs);
    }

    /// Record which window answered, `None` when every window was empty
    pub fn record_window(&self, window: Option<FetchWindow>) {
        let label = window.map(|w| w.label()).unwrap_or("none");
        self.inner().fetch_windows.with_label_values(&[label]).inc();
    }

    /// Record the outcome of one analyze/derive pass
    pub fn record_result(
        &self,
        shape: &MetricShape,
        features: Option<&FeatureSummary>,
        pair: &ThresholdPair,
    ) {
        let inner = self.inner();
        inner.metrics_processed.inc();

        if let Some(f) = features {
            if f.insufficient_data {
                inner.insufficient_data.inc();
            }
            if f.has_outliers == Some(true) {
                inner.outliers_flagged.inc();
            }
            if f.anomaly_detected == Some(true) {
                inner.anomalies_flagged.inc();
            }
        }

        if pair.is_unavailable() {
            inner.thresholds_unavailable.inc();
        } else if !pair.is_ordered(shape.direction) {
            inner.thresholds_inverted.inc();
        }
    }

    /// Current value of the processed-metrics counter
    pub fn metrics_processed(&self) -> u64 {
        self.inner().metrics_processed.get()
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render_text(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Structured logger for generator events
///
/// Provides consistent JSON-formatted logging for fetches, derived
/// thresholds, and run lifecycle.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log generator startup
    pub fn log_run_started(&self, version: &str, metric_count: usize, lookback_days: u32) {
        info!(
            event = "run_started",
            service = %self.service,
            generator_version = %version,
            metric_count = metric_count,
            lookback_days = lookback_days,
            "Starting ML-based threshold generation"
        );
    }

    /// Log which window produced the samples for a metric
    pub fn log_fetch(&self, metric: &str, window: Option<FetchWindow>, samples: usize) {
        match window {
            Some(window) => info!(
                event = "samples_fetched",
                service = %self.service,
                metric = %metric,
                window = %window,
                samples = samples,
                "Fetched samples"
            ),
            None => warn!(
                event = "samples_missing",
                service = %self.service,
                metric = %metric,
                "No data in any query window"
            ),
        }
    }

    /// Log the thresholds generated for a metric
    pub fn log_thresholds(
        &self,
        metric: &str,
        shape: &MetricShape,
        features: Option<&FeatureSummary>,
        pair: &ThresholdPair,
    ) {
        info!(
            event = "thresholds_generated",
            service = %self.service,
            metric = %metric,
            value_kind = %shape.value_kind,
            direction = %shape.direction,
            data_points = features.map(|f| f.data_points).unwrap_or(0),
            insufficient_data = features.map(|f| f.insufficient_data).unwrap_or(false),
            has_outliers = ?features.and_then(|f| f.has_outliers),
            anomaly_detected = ?features.and_then(|f| f.anomaly_detected),
            warning = pair.warning,
            critical = pair.critical,
            "Generated thresholds"
        );

        if !pair.is_unavailable() && !pair.is_ordered(shape.direction) {
            warn!(
                event = "thresholds_inverted",
                service = %self.service,
                metric = %metric,
                direction = %shape.direction,
                warning = pair.warning,
                critical = pair.critical,
                "Critical threshold is less severe than warning"
            );
        }
    }

    /// Log persisted output location
    pub fn log_results_saved(&self, output_dir: &str, rule_count: usize) {
        info!(
            event = "results_saved",
            service = %self.service,
            output_dir = %output_dir,
            rule_count = rule_count,
            "Results saved"
        );
    }

    /// Log run completion
    pub fn log_run_finished(&self, metric_count: usize, unavailable: usize, elapsed_secs: f64) {
        info!(
            event = "run_finished",
            service = %self.service,
            metric_count = metric_count,
            unavailable = unavailable,
            elapsed_secs = elapsed_secs,
            "Threshold generation finished"
        );
    }
}
