// riskwatch/src/commands/alerts.rs
//
// USE CASE: List alerts and apply operator lifecycle actions.

use comfy_table::{Table, presets::UTF8_FULL};
use std::path::Path;

use riskwatch_core::application::{acknowledge_alert, close_alert, list_alerts};
use riskwatch_core::domain::alert::{Alert, AlertFilter};

use super::fmt_score;

pub async fn list(project_dir: &Path, filter: AlertFilter) -> anyhow::Result<()> {
    let config = super::load_config(project_dir)?;
    let store = super::open_store(project_dir, &config)?;

    let alerts = list_alerts(&store, &filter).await?;
    if alerts.is_empty() {
        println!("No alerts match.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "ID", "Bucket", "Type", "Level", "Metric", "Value", "z", "Severity", "Status",
    ]);
    for a in &alerts {
        table.add_row(row(a));
    }
    println!("{}", table);
    println!("{} alert(s)", alerts.len());
    Ok(())
}

pub async fn acknowledge(project_dir: &Path, id: i64) -> anyhow::Result<()> {
    let config = super::load_config(project_dir)?;
    let store = super::open_store(project_dir, &config)?;
    let alert = acknowledge_alert(&store, id).await?;
    println!("👀 Alert #{} is {}", alert.id, alert.status);
    Ok(())
}

pub async fn close(project_dir: &Path, id: i64) -> anyhow::Result<()> {
    let config = super::load_config(project_dir)?;
    let store = super::open_store(project_dir, &config)?;
    let alert = close_alert(&store, id).await?;
    println!("✅ Alert #{} is {}", alert.id, alert.status);
    Ok(())
}

fn row(a: &Alert) -> Vec<String> {
    vec![
        a.id.to_string(),
        a.key.bucket.format("%Y-%m-%d %H:%M").to_string(),
        a.key.alert_type.clone(),
        a.key.level.to_string(),
        a.key.metric.clone(),
        format!("{:.2}", a.value),
        fmt_score(Some(a.zscore)),
        a.severity.to_string(),
        a.status.to_string(),
    ]
}
