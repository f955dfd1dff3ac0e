// riskwatch-core/src/domain/monitoring/mod.rs
//
// Pure monitoring logic: buckets, series, rolling statistics, anomaly rules.

pub mod anomaly;
pub mod bucket;
pub mod config;
pub mod level;
pub mod series;
pub mod zscore;

pub use anomaly::{AnomalyEvaluator, AnomalyRules, Direction, Severity, Verdict};
pub use bucket::{BucketRange, Granularity};
pub use config::{AlertScope, MetricDefinition, MetricSource, MonitoringConfig, RetryPolicy};
pub use level::{Dimension, Level};
pub use series::{MetricSeries, SeriesKey, SeriesPoint};
pub use zscore::{RollingStat, RollingZScore};
