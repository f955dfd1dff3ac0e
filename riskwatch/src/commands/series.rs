// riskwatch/src/commands/series.rs
//
// USE CASE: Inspect one series (value, baseline, z-score, verdict per bucket).

use chrono::NaiveDateTime;
use comfy_table::{Table, presets::UTF8_FULL};
use std::path::Path;

use riskwatch_core::application::MetricSourceAdapter;
use riskwatch_core::domain::error::DomainError;
use riskwatch_core::domain::monitoring::{AnomalyEvaluator, BucketRange, Level, RollingZScore};

use super::fmt_score;

pub async fn execute(
    project_dir: &Path,
    metric_name: &str,
    level: Level,
    now: Option<NaiveDateTime>,
) -> anyhow::Result<()> {
    let config = super::load_config(project_dir)?;
    let monitoring = &config.monitoring;
    let metric = monitoring
        .metric(metric_name)
        .ok_or_else(|| DomainError::UnknownMetric(metric_name.to_string()))?;

    let store = super::open_store(project_dir, &config)?;
    let now = now.unwrap_or_else(|| chrono::Utc::now().naive_utc());
    let range = BucketRange::ending_at(now, monitoring.bucket_granularity, monitoring.lookback_buckets);

    let adapter = MetricSourceAdapter::new(&store, &monitoring.retry);
    let series = adapter.series(metric, &level, &range).await?;
    let stats = RollingZScore::compute(&series.points, monitoring.window_size);
    let verdicts = AnomalyEvaluator::evaluate(&stats, &metric.rules);

    println!(
        "📈 {} (window {}, threshold {}, direction {:?})",
        series.key, monitoring.window_size, metric.rules.threshold, metric.rules.direction
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Bucket", "Value", "Mean", "Stddev", "z", "Verdict"]);
    for v in &verdicts {
        let verdict = match (v.alertable, v.is_anomalous, v.severity) {
            (true, _, Some(severity)) => format!("🚨 {}", severity),
            (false, true, _) => "anomalous (not alerted)".to_string(),
            _ => String::new(),
        };
        table.add_row(vec![
            v.stat.bucket.format("%Y-%m-%d %H:%M").to_string(),
            format!("{:.2}", v.stat.value),
            v.stat.mean.map(|m| format!("{:.2}", m)).unwrap_or_else(|| "-".into()),
            v.stat.stddev.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "-".into()),
            fmt_score(v.stat.zscore),
            verdict,
        ]);
    }
    println!("{}", table);
    Ok(())
}
