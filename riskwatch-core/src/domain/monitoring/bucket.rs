// riskwatch-core/src/domain/monitoring/bucket.rs

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of one aggregation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    #[default]
    Day,
    Week,
}

impl Granularity {
    /// Unit name understood by SQL `date_trunc`.
    pub fn as_sql_unit(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
        }
    }

    pub fn step(&self) -> Duration {
        match self {
            Self::Hour => Duration::hours(1),
            Self::Day => Duration::days(1),
            Self::Week => Duration::weeks(1),
        }
    }

    /// Start of the bucket containing `ts`. Weeks start on Monday, like `date_trunc('week', ..)`.
    pub fn truncate(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let date = ts.date();
        match self {
            Self::Hour => date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(ts.hour())),
            Self::Day => date.and_time(NaiveTime::MIN),
            Self::Week => {
                let offset = i64::from(date.weekday().num_days_from_monday());
                (date - Duration::days(offset)).and_time(NaiveTime::MIN)
            }
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql_unit())
    }
}

/// Contiguous run of buckets, `first` and `last` being bucket starts (both inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRange {
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub granularity: Granularity,
}

impl BucketRange {
    /// The `count` buckets ending with the one containing `now`.
    pub fn ending_at(now: NaiveDateTime, granularity: Granularity, count: usize) -> Self {
        let last = granularity.truncate(now);
        let span = i32::try_from(count.saturating_sub(1)).unwrap_or(i32::MAX);
        let first = granularity
            .step()
            .checked_mul(span)
            .and_then(|back| last.checked_sub_signed(back))
            .unwrap_or(NaiveDateTime::MIN);
        Self {
            first,
            last,
            granularity,
        }
    }

    /// Exclusive upper bound for range scans on raw timestamps.
    pub fn end_exclusive(&self) -> NaiveDateTime {
        self.last + self.granularity.step()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    pub fn contains(&self, bucket: NaiveDateTime) -> bool {
        bucket >= self.first && bucket <= self.last
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        let step = self.granularity.step();
        std::iter::successors(Some(self.first), move |b| Some(*b + step))
            .take_while(move |b| *b <= self.last)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 17, 3)
            .unwrap()
    }

    #[test]
    fn test_truncate() {
        let t = ts(2024, 1, 17, 13); // Wednesday
        assert_eq!(Granularity::Hour.truncate(t).to_string(), "2024-01-17 13:00:00");
        assert_eq!(Granularity::Day.truncate(t).to_string(), "2024-01-17 00:00:00");
        assert_eq!(Granularity::Week.truncate(t).to_string(), "2024-01-15 00:00:00");
    }

    #[test]
    fn test_range_ending_at_now() {
        let range = BucketRange::ending_at(ts(2024, 1, 15, 12), Granularity::Day, 15);
        assert_eq!(range.first.to_string(), "2024-01-01 00:00:00");
        assert_eq!(range.last.to_string(), "2024-01-15 00:00:00");
        assert_eq!(range.len(), 15);
        assert_eq!(range.end_exclusive().to_string(), "2024-01-16 00:00:00");
        assert!(range.contains(Granularity::Day.truncate(ts(2024, 1, 3, 8))));
    }

    #[test]
    fn test_hourly_range() {
        let range = BucketRange::ending_at(ts(2024, 3, 1, 2), Granularity::Hour, 4);
        let buckets: Vec<String> = range.iter().map(|b| b.to_string()).collect();
        assert_eq!(
            buckets,
            vec![
                "2024-02-29 23:00:00",
                "2024-03-01 00:00:00",
                "2024-03-01 01:00:00",
                "2024-03-01 02:00:00"
            ]
        );
    }

    #[test]
    fn test_oversized_range_saturates() {
        let range = BucketRange::ending_at(ts(2024, 1, 15, 12), Granularity::Week, usize::MAX);
        assert_eq!(range.first, NaiveDateTime::MIN);
        assert_eq!(range.last.to_string(), "2024-01-15 00:00:00");
    }
}
