// riskwatch-core/src/domain/monitoring/config.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::domain::monitoring::anomaly::{AnomalyRules, Direction};
use crate::domain::monitoring::bucket::Granularity;
use crate::domain::monitoring::level::Dimension;

/// Which facts a metric aggregates per bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricSource {
    /// Tickets created in the bucket.
    TicketCount,
    /// Share of tickets created in the bucket whose current prediction is `high`.
    /// Tickets not scored yet count as not high.
    HighRate,
    /// Sum of event values of one event type.
    EventSum { event_type: String },
}

impl MetricSource {
    /// Value of a bucket without any underlying fact.
    pub fn zero(&self) -> f64 {
        0.0
    }

    pub fn supports(&self, dimension: Dimension) -> bool {
        match self {
            Self::TicketCount | Self::HighRate => true,
            Self::EventSum { .. } => dimension == Dimension::Customer,
        }
    }
}

/// Partitions to materialize for one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSelector {
    #[serde(default = "default_true")]
    pub global: bool,
    /// Top-N busiest queues in the range (0 disables).
    #[serde(default)]
    pub queues: usize,
    #[serde(default)]
    pub tags: usize,
    #[serde(default)]
    pub customers: usize,
}

impl Default for LevelSelector {
    fn default() -> Self {
        Self {
            global: true,
            queues: 0,
            tags: 0,
            customers: 0,
        }
    }
}

impl LevelSelector {
    /// Enabled dimensions with their top-N limit.
    pub fn dimensions(&self) -> Vec<(Dimension, usize)> {
        [
            (Dimension::Queue, self.queues),
            (Dimension::Tag, self.tags),
            (Dimension::Customer, self.customers),
        ]
        .into_iter()
        .filter(|(_, limit)| *limit > 0)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_metric_levels"))]
pub struct MetricDefinition {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub alert_type: String,
    pub source: MetricSource,
    #[validate(nested)]
    #[serde(flatten)]
    pub rules: AnomalyRules,
    #[serde(default)]
    pub levels: LevelSelector,
}

fn validate_metric_levels(metric: &MetricDefinition) -> Result<(), ValidationError> {
    let unsupported = metric
        .levels
        .dimensions()
        .into_iter()
        .any(|(dim, _)| !metric.source.supports(dim));
    if unsupported {
        let mut err = ValidationError::new("unsupported_level");
        err.message = Some(
            format!(
                "metric '{}' cannot be partitioned by queue or tag (event metrics support global and customer only)",
                metric.name
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Which alertable buckets are written to the alert store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertScope {
    /// Only each partition's latest bucket.
    #[default]
    Latest,
    /// Every alertable bucket of the range.
    All,
}

/// Bounded exponential backoff for transient store failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RetryPolicy {
    #[validate(range(min = 1))]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): base * 2^attempt, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_monitoring"))]
pub struct MonitoringConfig {
    /// Number of preceding buckets forming the baseline (in buckets, not days).
    #[validate(range(min = 1))]
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub bucket_granularity: Granularity,
    /// Buckets fetched per series, the current one included.
    #[validate(range(max = 10_000))]
    #[serde(default = "default_lookback_buckets")]
    pub lookback_buckets: usize,
    #[serde(default)]
    pub alert_scope: AlertScope,
    #[validate(range(min = 1))]
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[validate(nested)]
    #[serde(default)]
    pub retry: RetryPolicy,
    #[validate(nested)]
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricDefinition>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            bucket_granularity: Granularity::default(),
            lookback_buckets: default_lookback_buckets(),
            alert_scope: AlertScope::default(),
            max_concurrency: default_max_concurrency(),
            retry: RetryPolicy::default(),
            metrics: default_metrics(),
        }
    }
}

impl MonitoringConfig {
    pub fn metric(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|m| m.name == name)
    }
}

fn validate_monitoring(cfg: &MonitoringConfig) -> Result<(), ValidationError> {
    if cfg.lookback_buckets <= cfg.window_size {
        let mut err = ValidationError::new("lookback_too_short");
        err.message = Some(
            format!(
                "lookback_buckets ({}) must exceed window_size ({}) or no bucket can ever be scored",
                cfg.lookback_buckets, cfg.window_size
            )
            .into(),
        );
        return Err(err);
    }
    let mut seen = HashSet::new();
    for m in &cfg.metrics {
        if !seen.insert(m.name.as_str()) {
            let mut err = ValidationError::new("duplicate_metric");
            err.message = Some(format!("metric '{}' is defined twice", m.name).into());
            return Err(err);
        }
    }
    Ok(())
}

fn default_true() -> bool {
    true
}
fn default_window_size() -> usize {
    14
}
fn default_lookback_buckets() -> usize {
    30
}
fn default_max_concurrency() -> usize {
    8
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    50
}
fn default_max_delay_ms() -> u64 {
    2000
}

pub fn default_metrics() -> Vec<MetricDefinition> {
    vec![
        MetricDefinition {
            name: "tickets_total".into(),
            alert_type: "tickets_spike".into(),
            source: MetricSource::TicketCount,
            rules: AnomalyRules::default(),
            levels: LevelSelector {
                global: true,
                queues: 5,
                tags: 5,
                customers: 0,
            },
        },
        MetricDefinition {
            name: "high_rate".into(),
            alert_type: "high_rate_spike".into(),
            source: MetricSource::HighRate,
            rules: AnomalyRules::default(),
            levels: LevelSelector {
                global: true,
                queues: 5,
                tags: 0,
                customers: 0,
            },
        },
        MetricDefinition {
            name: "auth_events".into(),
            alert_type: "auth_anomaly".into(),
            source: MetricSource::EventSum {
                event_type: "auth".into(),
            },
            rules: AnomalyRules {
                direction: Direction::Both,
                ..Default::default()
            },
            levels: LevelSelector {
                global: true,
                queues: 0,
                tags: 0,
                customers: 10,
            },
        },
    ]
}
