//! Result persistence
//!
//! Each run writes into its own timestamped folder under the output
//! directory: the Prometheus rule file and the JSON analysis document.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use threshold_lib::{GeneratorMetrics, RuleFile, ThresholdReport};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Paths written by [`save_results`]
#[derive(Debug, Clone)]
pub struct SavedResults {
    pub run_dir: PathBuf,
    pub rules_path: PathBuf,
    pub analysis_path: PathBuf,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Write the rule file and analysis document for a run
pub fn save_results(report: &ThresholdReport, output_dir: &Path, service: &str) -> Result<SavedResults> {
    let ts = timestamp(report.generated_at);
    let run_dir = output_dir.join(&ts);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create output directory {}", run_dir.display()))?;

    let rules_path = run_dir.join(format!("{}_thresholds_{}.yaml", service, ts));
    write_rules(&report.alert_rules, &rules_path)?;

    let analysis_path = run_dir.join(format!("threshold_analysis_{}.json", ts));
    let analysis = serde_json::to_string_pretty(&report.analysis_document())
        .context("Failed to serialize analysis document")?;
    fs::write(&analysis_path, analysis)
        .with_context(|| format!("Failed to write {}", analysis_path.display()))?;

    Ok(SavedResults {
        run_dir,
        rules_path,
        analysis_path,
    })
}

/// Write a Prometheus rule file as YAML
pub fn write_rules(rules: &RuleFile, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let yaml = serde_yaml_ng::to_string(rules).context("Failed to serialize alert rules")?;
    fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write the run metrics in the Prometheus text format
pub fn write_metrics_snapshot(metrics: &GeneratorMetrics, path: &Path) -> Result<()> {
    let text = metrics.render_text().context("Failed to encode run metrics")?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}
