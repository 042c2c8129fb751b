//! Prometheus alerting rule generation
//!
//! Turns derived threshold pairs into a Prometheus rule file:
//! - one rule per severity, comparing the metric query against its threshold
//! - `>` for upper-direction metrics, `<` for lower-direction metrics
//! - pending durations, labels and annotations for Alertmanager routing

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{MetricDefinition, ThresholdPair};

/// Default pending duration before a warning fires
pub const DEFAULT_WARNING_FOR: &str = "5m";

/// Default pending duration before a critical alert fires
pub const DEFAULT_CRITICAL_FOR: &str = "2m";

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    fn title(&self) -> &'static str {
        match self {
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Rule rendering options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOptions {
    /// Service the rules belong to (label and alert-name prefix)
    pub service: String,
    /// Rule group name
    pub group_name: String,
    /// Pending duration for warning rules
    pub warning_for: String,
    /// Pending duration for critical rules
    pub critical_for: String,
}

impl RuleOptions {
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        Self {
            group_name: format!("{}_ml_generated_alerts", service),
            service,
            warning_for: DEFAULT_WARNING_FOR.to_string(),
            critical_for: DEFAULT_CRITICAL_FOR.to_string(),
        }
    }

    pub fn with_group_name(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = group_name.into();
        self
    }

    pub fn with_pending(mut self, warning_for: impl Into<String>, critical_for: impl Into<String>) -> Self {
        self.warning_for = warning_for.into();
        self.critical_for = critical_for.into();
        self
    }

    fn pending_for(&self, severity: Severity) -> &str {
        match severity {
            Severity::Warning => &self.warning_for,
            Severity::Critical => &self.critical_for,
        }
    }
}

/// Prometheus rule file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    pub groups: Vec<RuleGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    pub rules: Vec<AlertRule>,
}

/// A single alerting rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub alert: String,
    pub expr: String,
    #[serde(rename = "for")]
    pub pending_for: String,
    pub labels: RuleLabels,
    pub annotations: RuleAnnotations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleLabels {
    pub severity: Severity,
    pub service: String,
    pub metric: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAnnotations {
    pub summary: String,
    pub description: String,
}

impl RuleFile {
    /// Total number of rules across groups
    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }
}

/// Render rules for each metric and its thresholds.
///
/// Metrics whose pair is the unavailable sentinel get no rules.
pub fn render<'a>(
    entries: impl IntoIterator<Item = (&'a MetricDefinition, &'a ThresholdPair)>,
    options: &RuleOptions,
) -> RuleFile {
    let mut rules = Vec::new();

    for (definition, pair) in entries {
        if pair.is_unavailable() {
            warn!(
                metric = %definition.name,
                "Skipping alert rules, no threshold could be derived"
            );
            continue;
        }

        for (severity, threshold) in [
            (Severity::Warning, pair.warning),
            (Severity::Critical, pair.critical),
        ] {
            rules.push(build_rule(definition, severity, threshold, options));
        }
    }

    RuleFile {
        groups: vec![RuleGroup {
            name: options.group_name.clone(),
            rules,
        }],
    }
}

fn build_rule(
    definition: &MetricDefinition,
    severity: Severity,
    threshold: f64,
    options: &RuleOptions,
) -> AlertRule {
    let query = definition.query.replace('\n', " ");
    let readable_metric = definition.name.replace('_', " ");
    let service_title = title_case(&options.service);

    AlertRule {
        alert: alert_name(&options.service, &definition.name, severity),
        expr: format!(
            "{} {} {}",
            query,
            definition.shape.direction.operator(),
            format_threshold(threshold)
        )
        .trim()
        .to_string(),
        pending_for: options.pending_for(severity).to_string(),
        labels: RuleLabels {
            severity,
            service: options.service.clone(),
            metric: definition.name.clone(),
        },
        annotations: RuleAnnotations {
            summary: format!(
                "{} {} {} threshold exceeded",
                service_title, readable_metric, severity
            ),
            description: format!(
                "{} {} is {{{{ $value }}}} (threshold: {})",
                service_title, readable_metric, format_threshold(threshold)
            ),
        },
    }
}

/// Threshold literal for rule text; whole numbers keep one decimal, e.g. `85.0`
fn format_threshold(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Alert name such as `Redis_MemoryUsagePercent_Warning`
pub fn alert_name(service: &str, metric: &str, severity: Severity) -> String {
    format!(
        "{}_{}_{}",
        title_case(service),
        title_case(metric).replace('_', ""),
        severity.title()
    )
}

/// Capitalise the first letter of every alphabetic run, lowercase the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, ValueKind};

    fn memory() -> MetricDefinition {
        MetricDefinition::new(
            "memory_usage_percent",
            "(redis_memory_used_bytes / redis_memory_max_bytes) * 100",
            ValueKind::Percentage,
            Direction::Upper,
        )
    }

    fn hit_rate() -> MetricDefinition {
        MetricDefinition::new(
            "hit_rate",
            "hits /\n total",
            ValueKind::Percentage,
            Direction::Lower,
        )
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("memory_usage_percent"), "Memory_Usage_Percent");
        assert_eq!(title_case("p99latency"), "P99Latency");
        assert_eq!(title_case("REDIS"), "Redis");
    }

    #[test]
    fn test_alert_name() {
        assert_eq!(
            alert_name("redis", "memory_usage_percent", Severity::Warning),
            "Redis_MemoryUsagePercent_Warning"
        );
        assert_eq!(
            alert_name("redis", "hit_rate", Severity::Critical),
            "Redis_HitRate_Critical"
        );
    }

    #[test]
    fn test_render_upper_and_lower() {
        let memory = memory();
        let hit_rate = hit_rate();
        let memory_pair = ThresholdPair::new(85.0, 95.0);
        let hit_pair = ThresholdPair::new(80.0, 75.5);
        let file = render(
            [(&memory, &memory_pair), (&hit_rate, &hit_pair)],
            &RuleOptions::new("redis"),
        );

        assert_eq!(file.groups.len(), 1);
        assert_eq!(file.groups[0].name, "redis_ml_generated_alerts");
        assert_eq!(file.rule_count(), 4);

        let rules = &file.groups[0].rules;
        assert_eq!(
            rules[0].expr,
            "(redis_memory_used_bytes / redis_memory_max_bytes) * 100 > 85.0"
        );
        assert_eq!(rules[0].pending_for, "5m");
        assert_eq!(rules[0].labels.severity, Severity::Warning);
        assert_eq!(rules[1].pending_for, "2m");
        assert_eq!(rules[1].labels.severity, Severity::Critical);

        assert_eq!(rules[3].expr, "hits /  total < 75.5");
        assert_eq!(rules[3].labels.metric, "hit_rate");
        assert_eq!(
            rules[2].annotations.summary,
            "Redis hit rate warning threshold exceeded"
        );
        assert_eq!(
            rules[2].annotations.description,
            "Redis hit rate is {{ $value }} (threshold: 80.0)"
        );
    }

    #[test]
    fn test_threshold_literal_keeps_decimal() {
        assert_eq!(format_threshold(85.0), "85.0");
        assert_eq!(format_threshold(0.0), "0.0");
        assert_eq!(format_threshold(75.5), "75.5");
        assert_eq!(format_threshold(1234.57), "1234.57");
    }

    #[test]
    fn test_unavailable_thresholds_skipped() {
        let memory = memory();
        let file = render(
            [(&memory, &ThresholdPair::UNAVAILABLE)],
            &RuleOptions::new("redis"),
        );
        assert_eq!(file.rule_count(), 0);
    }

    #[test]
    fn test_custom_options() {
        let memory = memory();
        let pair = ThresholdPair::new(1.0, 2.0);
        let options = RuleOptions::new("cache")
            .with_group_name("custom")
            .with_pending("10m", "1m");
        let file = render([(&memory, &pair)], &options);
        assert_eq!(file.groups[0].name, "custom");
        assert_eq!(file.groups[0].rules[0].alert, "Cache_MemoryUsagePercent_Warning");
        assert_eq!(file.groups[0].rules[0].pending_for, "10m");
        assert_eq!(file.groups[0].rules[1].pending_for, "1m");
    }

    #[test]
    fn test_rule_file_yaml_shape() {
        let memory = memory();
        let pair = ThresholdPair::new(85.0, 95.0);
        let file = render([(&memory, &pair)], &RuleOptions::new("redis"));
        let yaml = serde_yaml_ng::to_string(&file).unwrap();
        assert!(yaml.contains("groups:"));
        assert!(yaml.contains("for: 5m"));
        assert!(yaml.contains("severity: warning"));
    }
}
