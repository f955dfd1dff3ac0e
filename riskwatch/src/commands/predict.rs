// riskwatch/src/commands/predict.rs
//
// USE CASE: Apply the configured prediction policy and append the prediction.

use anyhow::Context;
use std::path::Path;

use riskwatch_core::application::record_prediction;
use riskwatch_core::domain::prediction::{ClassifierOutput, Priority};

pub async fn execute(
    project_dir: &Path,
    ticket_id: i64,
    category: String,
    priority: Priority,
    prob_high: Option<f64>,
    meta: Option<String>,
) -> anyhow::Result<()> {
    let config = super::load_config(project_dir)?;
    let store = super::open_store(project_dir, &config)?;

    let meta = match meta {
        Some(raw) => serde_json::from_str(&raw).context("--meta must be valid JSON")?,
        None => serde_json::Value::Null,
    };
    let output = ClassifierOutput {
        category,
        priority,
        prob_high,
    };

    let now = chrono::Utc::now().naive_utc();
    let (id, prediction) =
        record_prediction(&store, &config.prediction, ticket_id, output, meta, now).await?;

    println!(
        "🎯 Prediction #{} for ticket {}: {} / {} (policy: {})",
        id,
        ticket_id,
        prediction.pred_category,
        prediction.pred_priority,
        prediction.policy.as_str()
    );
    Ok(())
}
