// riskwatch-core/src/domain/alert/mod.rs

pub mod lifecycle;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::monitoring::anomaly::Severity;
use crate::domain::monitoring::level::Level;
use crate::domain::monitoring::series::SeriesKey;

pub use lifecycle::AlertStatus;

/// Natural key of an alert. At most one active alert exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey {
    pub alert_type: String,
    pub level: Level,
    pub metric: String,
    pub bucket: NaiveDateTime,
}

impl AlertKey {
    pub fn new(series: &SeriesKey, bucket: NaiveDateTime) -> Self {
        Self {
            alert_type: series.alert_type.clone(),
            level: series.level.clone(),
            metric: series.metric.clone(),
            bucket,
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.alert_type,
            self.level,
            self.metric,
            self.bucket.format("%Y-%m-%dT%H:%M:%S")
        )
    }
}

/// Alert about to be written by the materializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub key: AlertKey,
    pub value: f64,
    pub zscore: f64,
    pub window_size: usize,
    pub severity: Severity,
    /// Raised for the partition's latest bucket, hence eligible for auto-resolution.
    pub tracks_latest: bool,
    pub details: serde_json::Value,
}

/// Persisted alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub key: AlertKey,
    pub value: f64,
    pub zscore: f64,
    pub window_size: usize,
    pub severity: Severity,
    pub status: AlertStatus,
    pub tracks_latest: bool,
    pub details: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Listing criteria; `None` fields do not filter. Time bounds apply to the detection bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub alert_type: Option<String>,
    pub level: Option<Level>,
    pub metric: Option<String>,
    pub since: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
    pub limit: Option<usize>,
}

/// Result of an insert-unless-active write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(i64),
    /// An active alert already owns the key; nothing was written.
    AlreadyActive,
}
