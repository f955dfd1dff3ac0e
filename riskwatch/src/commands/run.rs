// riskwatch/src/commands/run.rs
//
// USE CASE: One monitoring pass.

use chrono::NaiveDateTime;
use comfy_table::{Table, presets::UTF8_FULL};
use std::path::Path;
use tracing::info;

use riskwatch_core::application::{PartitionStatus, RunSummary, run_monitor};
use riskwatch_core::domain::monitoring::AlertScope;
use riskwatch_core::infrastructure::fs::write_json_report;

use super::fmt_score;

pub async fn execute(
    project_dir: &Path,
    now: Option<NaiveDateTime>,
    backfill: bool,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    println!("⚙️  Loading configuration...");
    let config = super::load_config(project_dir)?;
    println!("   Project: {} (v{})", config.name, config.version);

    let store = super::open_store(project_dir, &config)?;

    let mut monitoring = config.monitoring.clone();
    if backfill {
        monitoring.alert_scope = AlertScope::All;
    }
    let now = now.unwrap_or_else(|| chrono::Utc::now().naive_utc());

    let summary = match run_monitor(&store, &store, &monitoring, now).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("\n💥 CRITICAL MONITORING ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", render(&summary));

    let report_path = project_dir
        .join(&config.target_path)
        .join("run_summary.json");
    write_json_report(&report_path, &summary)?;
    info!(path = ?report_path, "Run summary written");

    println!(
        "\n{} succeeded, {} skipped, {} failed. Alerts: {} created, {} closed ({:.2?})",
        summary.succeeded,
        summary.skipped,
        summary.failed,
        summary.alerts_created,
        summary.alerts_closed,
        start.elapsed()
    );

    if summary.has_failures() {
        eprintln!("❌ FAILURE. {} partitions failed.", summary.failed);
        std::process::exit(1);
    }
    Ok(())
}

fn render(summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Metric", "Level", "Status", "Points", "Latest z", "Created", "Unchanged", "Closed", "Note",
    ]);

    for p in &summary.partitions {
        let status = match p.status {
            PartitionStatus::Succeeded => "✅ succeeded",
            PartitionStatus::Skipped => "⏭️  skipped",
            PartitionStatus::Failed => "❌ failed",
        };
        let note = p
            .error
            .clone()
            .or_else(|| p.warnings.first().cloned())
            .unwrap_or_default();
        table.add_row(vec![
            p.metric.clone(),
            p.level.clone(),
            status.to_string(),
            p.points.to_string(),
            fmt_score(p.latest_zscore),
            p.alerts.created.to_string(),
            p.alerts.unchanged.to_string(),
            p.alerts.closed.to_string(),
            note,
        ]);
    }
    table
}
