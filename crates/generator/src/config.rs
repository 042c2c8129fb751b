//! Generator configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use threshold_lib::{
    pipeline::DEFAULT_LOOKBACK_DAYS,
    registry,
    rules::{RuleOptions, DEFAULT_CRITICAL_FOR, DEFAULT_WARNING_FOR},
    source::DEFAULT_TIMEOUT_SECS,
    MetricDefinition,
};

/// Environment variable prefix for overrides, e.g. `THRESHOLD_PROMETHEUS__URL`
const ENV_PREFIX: &str = "THRESHOLD";

/// Generator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Prometheus connection settings
    pub prometheus: PrometheusConfig,

    /// Days of history for the first query window
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Service name used in rule labels and alert names
    #[serde(default = "default_service")]
    pub service: String,

    /// Rule group name, derived from the service when unset
    #[serde(default)]
    pub group_name: Option<String>,

    /// Directory receiving timestamped result folders
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Pending durations for generated rules
    #[serde(default)]
    pub rules: RulesConfig,

    /// Tracked metrics; the Redis defaults are used when empty
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusConfig {
    pub url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_warning_for")]
    pub warning_for: String,

    #[serde(default = "default_critical_for")]
    pub critical_for: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            warning_for: default_warning_for(),
            critical_for: default_critical_for(),
        }
    }
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_service() -> String {
    "redis".to_string()
}

fn default_output_dir() -> String {
    "Output".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_warning_for() -> String {
    DEFAULT_WARNING_FOR.to_string()
}

fn default_critical_for() -> String {
    DEFAULT_CRITICAL_FOR.to_string()
}

impl GeneratorConfig {
    /// Load configuration from a file, with environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Load with an explicit variable set in place of the process environment
    fn load_with_env(path: &Path, env: Option<config::Map<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        config
            .try_deserialize()
            .context("Invalid generator configuration")
    }

    /// Metric definitions to process
    pub fn metric_definitions(&self) -> Vec<MetricDefinition> {
        if self.metrics.is_empty() {
            registry::redis_defaults()
        } else {
            self.metrics.clone()
        }
    }

    /// Rule rendering options
    pub fn rule_options(&self) -> RuleOptions {
        let options = RuleOptions::new(&self.service)
            .with_pending(&self.rules.warning_for, &self.rules.critical_for);
        match &self.group_name {
            Some(name) => options.with_group_name(name),
            None => options,
        }
    }
}
