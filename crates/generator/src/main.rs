//! Threshold Generator
//!
//! Fetches metric history from Prometheus, derives warning and critical
//! thresholds from its distribution, and writes Prometheus alert rules.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use threshold_lib::{
    GeneratorMetrics, PrometheusSource, StructuredLogger, ThresholdGenerator, ThresholdReport,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod output;
mod persist;

const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Statistical alert-threshold generator
#[derive(Parser)]
#[command(name = "threshold-generator")]
#[command(author, version, about = "Derive Prometheus alert thresholds from metric history", long_about = None)]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(long, short, env = "THRESHOLD_CONFIG")]
    pub config: PathBuf,

    /// Also write the rule file to this path
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Override the configured output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Summary format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Write run metrics in the Prometheus text format to this path
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let config = config::GeneratorConfig::load(&cli.config)?;
    info!(prometheus = %config.prometheus.url, service = %config.service, "Generator configured");

    let definitions = config.metric_definitions();
    let logger = StructuredLogger::new(&config.service);
    logger.log_run_started(GENERATOR_VERSION, definitions.len(), config.lookback_days);

    let source = PrometheusSource::new(
        &config.prometheus.url,
        Duration::from_secs(config.prometheus.timeout_secs),
    )?;
    let generator = ThresholdGenerator::new(Arc::new(source), logger.clone())
        .with_lookback_days(config.lookback_days);

    let started = Instant::now();
    let results = generator.run(&definitions).await;
    let report = ThresholdReport::new(results, &config.rule_options());

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));
    let saved = persist::save_results(&report, &output_dir, &config.service)?;
    logger.log_results_saved(
        &saved.run_dir.display().to_string(),
        report.alert_rules.rule_count(),
    );

    if let Some(path) = &cli.output {
        persist::write_rules(&report.alert_rules, path)?;
        info!(path = %path.display(), "Alert rules written");
    }

    if let Some(path) = &cli.metrics_file {
        persist::write_metrics_snapshot(&GeneratorMetrics::new(), path)?;
        info!(path = %path.display(), "Run metrics written");
    }

    let unavailable: Vec<&str> = report
        .unavailable()
        .map(|r| r.definition.name.as_str())
        .collect();
    logger.log_run_finished(
        report.results.len(),
        unavailable.len(),
        started.elapsed().as_secs_f64(),
    );

    output::print_summary(&report, cli.format);
    if matches!(cli.format, output::OutputFormat::Json) {
        return Ok(());
    }
    if !unavailable.is_empty() {
        output::print_warning(&format!(
            "No data for {} metric(s): {}",
            unavailable.len(),
            unavailable.join(", ")
        ));
    }
    output::print_info(&format!("Results saved to {}", saved.run_dir.display()));
    output::print_success("Threshold generation completed successfully!");

    Ok(())
}
