// riskwatch-core/src/application/monitor.rs

use chrono::NaiveDateTime;
use futures::StreamExt;
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::application::alerting::{AlertMaterializer, MaterializeReport, PartitionEvaluation};
use crate::application::source::MetricSourceAdapter;
use crate::domain::error::DomainError;
use crate::domain::monitoring::{
    AnomalyEvaluator, BucketRange, Granularity, Level, MetricDefinition, MonitoringConfig,
    RollingZScore, Verdict,
};
use crate::domain::monitoring::zscore::serialize_score;
use crate::error::RiskwatchError;
use crate::ports::store::{AlertStore, FactSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStatus {
    Succeeded,
    /// Store still unavailable after retries; the next run picks it up.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionReport {
    pub metric: String,
    pub level: String,
    pub status: PartitionStatus,
    pub points: usize,
    #[serde(serialize_with = "serialize_score")]
    pub latest_zscore: Option<f64>,
    pub alerts: MaterializeReport,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl PartitionReport {
    fn from_error(metric: &str, level: String, err: &RiskwatchError) -> Self {
        let status = if err.is_transient() {
            PartitionStatus::Skipped
        } else {
            PartitionStatus::Failed
        };
        Self {
            metric: metric.to_string(),
            level,
            status,
            points: 0,
            latest_zscore: None,
            alerts: MaterializeReport::default(),
            warnings: Vec::new(),
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub now: NaiveDateTime,
    pub granularity: Granularity,
    pub range_first: NaiveDateTime,
    pub range_last: NaiveDateTime,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub alerts_created: usize,
    pub alerts_closed: usize,
    pub partitions: Vec<PartitionReport>,
}

impl RunSummary {
    fn new(now: NaiveDateTime, range: &BucketRange, mut partitions: Vec<PartitionReport>) -> Self {
        partitions.sort_by(|a, b| (&a.metric, &a.level).cmp(&(&b.metric, &b.level)));
        let count = |s: PartitionStatus| partitions.iter().filter(|p| p.status == s).count();
        Self {
            now,
            granularity: range.granularity,
            range_first: range.first,
            range_last: range.last,
            succeeded: count(PartitionStatus::Succeeded),
            skipped: count(PartitionStatus::Skipped),
            failed: count(PartitionStatus::Failed),
            alerts_created: partitions.iter().map(|p| p.alerts.created).sum(),
            alerts_closed: partitions.iter().map(|p| p.alerts.closed).sum(),
            partitions,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// One monitoring pass over every configured metric and partition.
///
/// Partitions are independent: a failing one is reported and the others proceed.
#[instrument(skip(facts, alerts, config), fields(metrics = config.metrics.len()))]
pub async fn run_monitor(
    facts: &dyn FactSource,
    alerts: &dyn AlertStore,
    config: &MonitoringConfig,
    now: NaiveDateTime,
) -> Result<RunSummary, RiskwatchError> {
    let start_time = Instant::now();
    let range = BucketRange::ending_at(now, config.bucket_granularity, config.lookback_buckets);
    info!(first = %range.first, last = %range.last, "Starting monitoring run");

    let adapter = MetricSourceAdapter::new(facts, &config.retry);

    // 1. PLANNING
    let mut reports = Vec::new();
    let mut tasks: Vec<(&MetricDefinition, Level)> = Vec::new();
    for metric in &config.metrics {
        let (levels, failures) = adapter.partitions(metric, &range).await;
        for failure in failures {
            warn!(metric = %metric.name, scope = %failure.scope, error = %failure.error, "Partition enumeration failed");
            reports.push(PartitionReport::from_error(
                &metric.name,
                failure.scope,
                &failure.error,
            ));
        }
        tasks.extend(levels.into_iter().map(|level| (metric, level)));
    }
    info!(partitions = tasks.len(), "Execution plan ready");

    // 2. EVALUATION (bounded concurrency)
    let adapter = &adapter;
    let range = &range;
    let futures = tasks.into_iter().map(|(metric, level)| async move {
        match evaluate_partition(adapter, alerts, config, metric, &level, range).await {
            Ok(report) => report,
            Err(e) => {
                error!(metric = %metric.name, level = %level, error = %e, "Partition failed");
                PartitionReport::from_error(&metric.name, level.to_string(), &e)
            }
        }
    });
    let results: Vec<PartitionReport> = futures::stream::iter(futures)
        .buffer_unordered(config.max_concurrency.max(1))
        .collect()
        .await;
    reports.extend(results);

    let summary = RunSummary::new(now, range, reports);
    info!(
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        created = summary.alerts_created,
        closed = summary.alerts_closed,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Monitoring run finished"
    );
    Ok(summary)
}

async fn evaluate_partition(
    adapter: &MetricSourceAdapter<'_>,
    alerts: &dyn AlertStore,
    config: &MonitoringConfig,
    metric: &MetricDefinition,
    level: &Level,
    range: &BucketRange,
) -> Result<PartitionReport, RiskwatchError> {
    let series = adapter.series(metric, level, range).await?;
    let stats = RollingZScore::compute(&series.points, config.window_size);
    let verdicts = AnomalyEvaluator::evaluate(&stats, &metric.rules);

    let mut warnings = Vec::new();
    let preceding = series.points.len().saturating_sub(1);
    if preceding < config.window_size {
        let gap = DomainError::DataGap {
            series: series.key.to_string(),
            available: preceding,
            required: config.window_size,
        };
        warn!("{}", gap);
        warnings.push(gap.to_string());
    }

    let latest_zscore = verdicts.last().and_then(|v: &Verdict| v.stat.zscore);
    let points = series.points.len();
    let eval = PartitionEvaluation {
        series: series.key,
        verdicts,
        window_size: config.window_size,
        rules: metric.rules.clone(),
        scope: config.alert_scope,
    };
    let materialized = AlertMaterializer::materialize(alerts, &eval, &config.retry).await?;

    Ok(PartitionReport {
        metric: metric.name.clone(),
        level: level.to_string(),
        status: PartitionStatus::Succeeded,
        points,
        latest_zscore,
        alerts: materialized,
        warnings,
        error: None,
    })
}
