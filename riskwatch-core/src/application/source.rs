// riskwatch-core/src/application/source.rs

use tracing::debug;

use crate::domain::monitoring::{BucketRange, Level, MetricDefinition, MetricSeries, RetryPolicy, SeriesKey};
use crate::error::RiskwatchError;
use crate::infrastructure::retry::with_backoff;
use crate::ports::store::FactSource;

/// Turns sparse store aggregates into dense series and enumerates the partitions to score.
pub struct MetricSourceAdapter<'a> {
    facts: &'a dyn FactSource,
    retry: &'a RetryPolicy,
}

impl<'a> MetricSourceAdapter<'a> {
    pub fn new(facts: &'a dyn FactSource, retry: &'a RetryPolicy) -> Self {
        Self { facts, retry }
    }

    /// Exactly one point per bucket of `range`; empty buckets take the metric's zero.
    pub async fn series(
        &self,
        metric: &MetricDefinition,
        level: &Level,
        range: &BucketRange,
    ) -> Result<MetricSeries, RiskwatchError> {
        let key = SeriesKey {
            alert_type: metric.alert_type.clone(),
            metric: metric.name.clone(),
            level: level.clone(),
        };
        let label = format!("series {}", key);
        let facts = self.facts;
        let observed = with_backoff(self.retry, &label, || {
            facts.observed_buckets(&metric.source, level, range)
        })
        .await?;

        debug!(series = %key, observed = observed.len(), buckets = range.len(), "Densifying");
        Ok(MetricSeries::densify(key, range, observed, metric.source.zero()))
    }

    /// Global level (when enabled) followed by the top-N partitions of each enabled dimension.
    ///
    /// A dimension whose enumeration fails is reported in the second list; the others are
    /// still planned.
    pub async fn partitions(
        &self,
        metric: &MetricDefinition,
        range: &BucketRange,
    ) -> (Vec<Level>, Vec<PlanningFailure>) {
        let facts = self.facts;
        let mut levels = Vec::new();
        let mut failures = Vec::new();
        if metric.levels.global {
            levels.push(Level::Global);
        }

        for (dimension, limit) in metric.levels.dimensions() {
            let label = format!("partitions {}/{}", metric.name, dimension.as_str());
            let found = with_backoff(self.retry, &label, || {
                facts.top_partitions(&metric.source, dimension, range, limit)
            })
            .await;
            match found {
                Ok(values) => levels.extend(values.into_iter().map(|v| dimension.level(v))),
                Err(error) => failures.push(PlanningFailure {
                    scope: format!("{}:*", dimension.as_str()),
                    error,
                }),
            }
        }
        (levels, failures)
    }
}

/// A dimension whose partitions could not be enumerated.
#[derive(Debug)]
pub struct PlanningFailure {
    pub scope: String,
    pub error: RiskwatchError,
}
