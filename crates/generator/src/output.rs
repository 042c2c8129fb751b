//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use threshold_lib::{MetricResult, ThresholdReport};

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// One summary line per processed metric
#[derive(Debug, Tabled, Serialize)]
pub struct SummaryRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Direction")]
    pub direction: String,
    #[tabled(rename = "Window")]
    pub window: String,
    #[tabled(rename = "Points")]
    pub points: usize,
    #[tabled(rename = "Warning")]
    pub warning: String,
    #[tabled(rename = "Critical")]
    pub critical: String,
    #[tabled(rename = "Flags")]
    pub flags: String,
}

impl SummaryRow {
    pub fn from_result(result: &MetricResult) -> Self {
        let unavailable = result.thresholds.is_unavailable();
        Self {
            metric: result.definition.name.clone(),
            kind: result.definition.shape.value_kind.to_string(),
            direction: result.definition.shape.direction.to_string(),
            window: result
                .window
                .map(|w| w.to_string())
                .unwrap_or_else(|| "-".to_string()),
            points: result.features.as_ref().map(|f| f.data_points).unwrap_or(0),
            warning: format_threshold(result.thresholds.warning, unavailable),
            critical: format_threshold(result.thresholds.critical, unavailable),
            flags: flags(result),
        }
    }
}

/// Print the per-metric summary of a run
pub fn print_summary(report: &ThresholdReport, format: OutputFormat) {
    let rows: Vec<SummaryRow> = report.results.iter().map(SummaryRow::from_result).collect();

    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No metrics processed".yellow());
                return;
            }
            let table = Table::new(&rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&rows) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

fn format_threshold(value: f64, unavailable: bool) -> String {
    if unavailable {
        "n/a".dimmed().to_string()
    } else {
        format!("{:.2}", value)
    }
}

/// Short markers for summary caveats
fn flags(result: &MetricResult) -> String {
    let mut flags = Vec::new();
    if let Some(features) = &result.features {
        if features.insufficient_data {
            flags.push("sparse".yellow().to_string());
        }
        if features.has_outliers == Some(true) {
            flags.push("outliers".yellow().to_string());
        }
        if features.anomaly_detected == Some(true) {
            flags.push("anomalies".red().to_string());
        }
    }
    if !result.thresholds.is_unavailable()
        && !result.thresholds.is_ordered(result.definition.shape.direction)
    {
        flags.push("inverted".red().to_string());
    }
    flags.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use threshold_lib::analyzer::analyze_values;
    use threshold_lib::{Direction, FetchWindow, MetricDefinition, ThresholdPair, ValueKind};

    fn result(values: &[f64], thresholds: ThresholdPair) -> MetricResult {
        MetricResult {
            definition: MetricDefinition::new(
                "connected_clients",
                "redis_connected_clients",
                ValueKind::Count,
                Direction::Upper,
            ),
            window: Some(FetchWindow::Lookback { days: 28 }),
            features: analyze_values(values),
            thresholds,
        }
    }

    #[test]
    fn test_row_from_result() {
        colored::control::set_override(false);
        let row = SummaryRow::from_result(&result(&[1.0, 2.0, 3.0], ThresholdPair::new(4.5, 5.25)));

        assert_eq!(row.metric, "connected_clients");
        assert_eq!(row.kind, "count");
        assert_eq!(row.direction, "upper");
        assert_eq!(row.window, "28d");
        assert_eq!(row.points, 3);
        assert_eq!(row.warning, "4.50");
        assert_eq!(row.critical, "5.25");
        assert!(row.flags.is_empty());
    }

    #[test]
    fn test_unavailable_row() {
        colored::control::set_override(false);
        let row = SummaryRow::from_result(&MetricResult::unavailable(MetricDefinition::new(
            "missing",
            "q",
            ValueKind::Rate,
            Direction::Upper,
        )));

        assert_eq!(row.window, "-");
        assert_eq!(row.points, 0);
        assert_eq!(row.warning, "n/a");
        assert_eq!(row.critical, "n/a");
    }

    #[test]
    fn test_flags_mark_sparse_and_inverted() {
        colored::control::set_override(false);
        let row = SummaryRow::from_result(&result(&[10.0], ThresholdPair::new(14.0, 12.0)));
        assert_eq!(row.flags, "sparse inverted");
    }
}
