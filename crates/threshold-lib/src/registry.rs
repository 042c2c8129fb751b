//! Built-in metric definitions
//!
//! The registry is plain data owned by the caller. [`redis_defaults`] returns
//! a fresh table covering the standard redis_exporter metrics.

use crate::models::{Direction, MetricDefinition, ValueKind};

/// Default definitions for Redis monitoring via redis_exporter
pub fn redis_defaults() -> Vec<MetricDefinition> {
    use Direction::{Lower, Upper};
    use ValueKind::{Bytes, Count, Duration, Percentage, Rate};

    vec![
        MetricDefinition::new(
            "memory_usage_percent",
            "(redis_memory_used_bytes / redis_memory_max_bytes) * 100",
            Percentage,
            Upper,
        ),
        MetricDefinition::new(
            "connected_clients",
            "redis_connected_clients",
            Count,
            Upper,
        ),
        MetricDefinition::new(
            "rejected_connections",
            "increase(redis_rejected_connections_total[5m])",
            Rate,
            Upper,
        ),
        MetricDefinition::new(
            "slow_queries",
            "increase(redis_slowlog_length[5m])",
            Rate,
            Upper,
        ),
        MetricDefinition::new(
            "command_latency",
            "redis_command_duration_seconds_total / redis_commands_processed_total",
            Duration,
            Upper,
        ),
        MetricDefinition::new(
            "evicted_keys",
            "increase(redis_evicted_keys_total[5m])",
            Rate,
            Upper,
        ),
        MetricDefinition::new(
            "cpu_usage",
            "redis_cpu_sys_seconds_total + redis_cpu_user_seconds_total",
            Duration,
            Upper,
        ),
        MetricDefinition::new(
            "hit_rate",
            "(redis_keyspace_hits_total / (redis_keyspace_hits_total + redis_keyspace_misses_total)) * 100",
            Percentage,
            Lower,
        ),
        MetricDefinition::new(
            "network_io",
            "rate(redis_net_input_bytes_total[5m]) + rate(redis_net_output_bytes_total[5m])",
            Bytes,
            Upper,
        ),
        MetricDefinition::new(
            "replication_lag",
            "redis_master_repl_offset - redis_slave_repl_offset",
            Bytes,
            Upper,
        ),
    ]
}

/// Look up a definition by metric name
pub fn find<'a>(definitions: &'a [MetricDefinition], name: &str) -> Option<&'a MetricDefinition> {
    definitions.iter().find(|d| d.name == name)
}
