// riskwatch-core/src/ports/store.rs

// What the engine needs from storage, without knowing which database sits behind it.
// The DuckDB adapter implements all three; tests plug in mocks.

use async_trait::async_trait;

use crate::domain::alert::{Alert, AlertFilter, AlertKey, AlertStatus, InsertOutcome, NewAlert};
use crate::domain::monitoring::{BucketRange, Dimension, Level, MetricSource, SeriesKey, SeriesPoint};
use crate::domain::prediction::NewPrediction;
use crate::error::RiskwatchError;

/// Read side over tickets, predictions and events.
#[async_trait]
pub trait FactSource: Send + Sync {
    /// Per-bucket aggregates of `source` at `level`. Buckets without facts are absent.
    async fn observed_buckets(
        &self,
        source: &MetricSource,
        level: &Level,
        range: &BucketRange,
    ) -> Result<Vec<SeriesPoint>, RiskwatchError>;

    /// Partition values of `dimension` seen in `range`, busiest first.
    async fn top_partitions(
        &self,
        source: &MetricSource,
        dimension: Dimension,
        range: &BucketRange,
        limit: usize,
    ) -> Result<Vec<String>, RiskwatchError>;
}

/// Alert persistence keyed by the natural key.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Inserts an open alert unless an active one already owns the key.
    ///
    /// Must be atomic with respect to concurrent callers on the same key.
    async fn insert_unless_active(&self, alert: &NewAlert)
    -> Result<InsertOutcome, RiskwatchError>;

    /// Whether any alert (whatever its status) was ever raised for `key`.
    async fn exists(&self, key: &AlertKey) -> Result<bool, RiskwatchError>;

    /// Open alerts of `series` flagged as tracking the latest bucket.
    async fn open_tracking(&self, series: &SeriesKey) -> Result<Vec<Alert>, RiskwatchError>;

    async fn get(&self, id: i64) -> Result<Option<Alert>, RiskwatchError>;

    /// Moves the alert from `from` to `to` in one write; closing releases the natural key.
    ///
    /// Returns `false` when the stored status is no longer `from` (nothing is written).
    async fn set_status(
        &self,
        id: i64,
        from: AlertStatus,
        to: AlertStatus,
    ) -> Result<bool, RiskwatchError>;

    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, RiskwatchError>;
}

#[async_trait]
pub trait PredictionSink: Send + Sync {
    /// Appends a prediction and returns its id.
    async fn append_prediction(&self, prediction: &NewPrediction) -> Result<i64, RiskwatchError>;
}
