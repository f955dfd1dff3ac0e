// riskwatch-core/src/application/prediction.rs

use chrono::NaiveDateTime;
use tracing::info;

use crate::domain::prediction::{ClassifierOutput, NewPrediction, PredictionConfig};
use crate::error::RiskwatchError;
use crate::ports::store::PredictionSink;

/// Applies the configured policy to a classifier output and appends the prediction.
///
/// The argmax priority is kept in `meta` so overrides by the safety policy stay visible.
pub async fn record_prediction(
    sink: &dyn PredictionSink,
    config: &PredictionConfig,
    ticket_id: i64,
    output: ClassifierOutput,
    meta: serde_json::Value,
    now: NaiveDateTime,
) -> Result<(i64, NewPrediction), RiskwatchError> {
    let policy = config.resolve()?;
    let priority = policy.select_priority(output.priority, output.prob_high)?;

    let mut meta = match meta {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".into(), other);
            map
        }
    };
    meta.insert("argmax_priority".into(), output.priority.as_str().into());

    let prediction = NewPrediction {
        ticket_id,
        created_at: now,
        model_name: config.model_name.clone(),
        model_version: config.model_version.clone(),
        policy: policy.name(),
        threshold_high: policy.threshold_high(),
        pred_category: output.category,
        pred_priority: priority,
        proba_high: output.prob_high,
        meta: serde_json::Value::Object(meta),
    };

    let id = sink.append_prediction(&prediction).await?;
    info!(
        prediction_id = id,
        ticket_id,
        policy = policy.name().as_str(),
        priority = priority.as_str(),
        "Prediction recorded"
    );
    Ok((id, prediction))
}
