// riskwatch-core/src/domain/monitoring/series.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::monitoring::bucket::BucketRange;
use crate::domain::monitoring::level::Level;

/// One aggregated value for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub bucket: NaiveDateTime,
    pub value: f64,
}

/// Identity of a monitored series: which metric, at which level, raising which alert type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub alert_type: String,
    pub metric: String,
    pub level: Level,
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.metric, self.level)
    }
}

/// Gap-free, time-ordered series for one (metric, level).
#[derive(Debug, Clone)]
pub struct MetricSeries {
    pub key: SeriesKey,
    pub points: Vec<SeriesPoint>,
}

impl MetricSeries {
    /// Builds the dense series over `range` from sparse observations.
    ///
    /// Buckets without observations take `zero`. Observations outside the range are dropped,
    /// duplicates for one bucket are summed.
    pub fn densify(
        key: SeriesKey,
        range: &BucketRange,
        observed: impl IntoIterator<Item = SeriesPoint>,
        zero: f64,
    ) -> Self {
        let mut by_bucket: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
        for point in observed {
            let bucket = range.granularity.truncate(point.bucket);
            if range.contains(bucket) {
                *by_bucket.entry(bucket).or_insert(0.0) += point.value;
            }
        }

        let points = range
            .iter()
            .map(|bucket| SeriesPoint {
                bucket,
                value: by_bucket.get(&bucket).copied().unwrap_or(zero),
            })
            .collect();

        Self { key, points }
    }

    pub fn latest(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }
}
