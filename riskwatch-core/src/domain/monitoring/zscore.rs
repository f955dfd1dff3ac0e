// riskwatch-core/src/domain/monitoring/zscore.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::monitoring::series::SeriesPoint;

/// Below this, a window's standard deviation is treated as zero.
const ZERO_STDDEV: f64 = 1e-9;

/// Running mean/variance accumulator (Welford).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct WindowStats {
    pub mean: f64,
    /// Population variance of the values pushed so far.
    pub variance: f64,
    pub count: u64,
}

impl WindowStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean = value;
            self.variance = 0.0;
            return;
        }
        let old_mean = self.mean;
        self.mean += (value - old_mean) / self.count as f64;
        // M2_new = M2_old + (x - old_mean) * (x - new_mean)
        let prev_m2 = self.variance * (self.count - 1) as f64;
        let new_m2 = prev_m2 + (value - old_mean) * (value - self.mean);
        self.variance = new_m2 / self.count as f64;
    }

    pub fn from_values(values: &[SeriesPoint]) -> Self {
        let mut stats = Self::default();
        for p in values {
            stats.push(p.value);
        }
        stats
    }

    pub fn stddev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }

    /// Score of `current` against this window.
    ///
    /// A flat window yields `+inf` when `current` lies strictly above it and `0.0` otherwise.
    pub fn zscore(&self, current: f64) -> f64 {
        let stddev = self.stddev();
        if stddev > ZERO_STDDEV {
            (current - self.mean) / stddev
        } else if current - self.mean > ZERO_STDDEV {
            f64::INFINITY
        } else {
            0.0
        }
    }
}

/// Statistics for one bucket relative to its trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingStat {
    pub bucket: NaiveDateTime,
    pub value: f64,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    /// `None` while fewer than `window_size` buckets precede this one.
    pub zscore: Option<f64>,
}

/// Writes a score for JSON reports.
///
/// JSON has no infinity, and `null` already means "not enough history", so unbounded scores
/// are written as the strings `"+inf"` and `"-inf"`.
pub fn serialize_score<S: Serializer>(score: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match score {
        None => s.serialize_none(),
        Some(z) if *z == f64::INFINITY => s.serialize_str("+inf"),
        Some(z) if *z == f64::NEG_INFINITY => s.serialize_str("-inf"),
        Some(z) => s.serialize_f64(*z),
    }
}

pub struct RollingZScore;

impl RollingZScore {
    /// Scores every point against the `window_size` points strictly preceding it.
    ///
    /// The output is aligned one-to-one with `points`, which must be in increasing bucket order.
    pub fn compute(points: &[SeriesPoint], window_size: usize) -> Vec<RollingStat> {
        points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                if window_size == 0 || i < window_size {
                    return RollingStat {
                        bucket: point.bucket,
                        value: point.value,
                        mean: None,
                        stddev: None,
                        zscore: None,
                    };
                }
                let stats = WindowStats::from_values(&points[i - window_size..i]);
                RollingStat {
                    bucket: point.bucket,
                    value: point.value,
                    mean: Some(stats.mean),
                    stddev: Some(stats.stddev()),
                    zscore: Some(stats.zscore(point.value)),
                }
            })
            .collect()
    }
}
