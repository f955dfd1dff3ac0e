// riskwatch-core/src/domain/prediction/mod.rs

pub mod policy;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use policy::{PolicyName, PredictionConfig, PredictionPolicy, Priority};

/// Raw classifier output for one ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub category: String,
    /// Argmax priority label.
    pub priority: Priority,
    pub prob_high: Option<f64>,
}

/// Append-only prediction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
    pub ticket_id: i64,
    pub created_at: NaiveDateTime,
    pub model_name: String,
    pub model_version: String,
    pub policy: PolicyName,
    pub threshold_high: Option<f64>,
    pub pred_category: String,
    pub pred_priority: Priority,
    pub proba_high: Option<f64>,
    pub meta: serde_json::Value,
}
