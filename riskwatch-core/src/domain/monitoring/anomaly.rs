// riskwatch-core/src/domain/monitoring/anomaly.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

use crate::domain::monitoring::zscore::RollingStat;

/// Which deviations may raise an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Spikes only. Drops are still flagged as anomalous but never alerted.
    #[default]
    Increase,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// |z| breakpoints, checked from the most severe down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_breakpoints"))]
pub struct SeverityBreakpoints {
    #[serde(default = "default_warn")]
    pub warn: f64,
    #[serde(default = "default_critical")]
    pub critical: f64,
}

impl Default for SeverityBreakpoints {
    fn default() -> Self {
        Self {
            warn: default_warn(),
            critical: default_critical(),
        }
    }
}

impl SeverityBreakpoints {
    pub fn classify(&self, abs_zscore: f64) -> Severity {
        if abs_zscore >= self.critical {
            Severity::Critical
        } else if abs_zscore >= self.warn {
            Severity::Warn
        } else {
            Severity::Info
        }
    }
}

fn validate_breakpoints(b: &SeverityBreakpoints) -> Result<(), ValidationError> {
    if !(b.warn > 0.0 && b.warn <= b.critical) {
        return Err(ValidationError::new("severity_breakpoints_unordered"));
    }
    Ok(())
}

fn default_warn() -> f64 {
    2.0
}
fn default_critical() -> f64 {
    3.5
}
fn default_threshold() -> f64 {
    2.0
}

/// Per-metric detection rules, loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AnomalyRules {
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub direction: Direction,
    #[validate(nested)]
    #[serde(default)]
    pub severity: SeverityBreakpoints,
}

impl Default for AnomalyRules {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            direction: Direction::default(),
            severity: SeverityBreakpoints::default(),
        }
    }
}

/// Outcome of the rules for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub stat: RollingStat,
    pub is_anomalous: bool,
    /// Anomalous and in a direction the metric alerts on.
    pub alertable: bool,
    pub severity: Option<Severity>,
}

pub struct AnomalyEvaluator;

impl AnomalyEvaluator {
    pub fn evaluate(stats: &[RollingStat], rules: &AnomalyRules) -> Vec<Verdict> {
        stats.iter().map(|s| Self::judge(*s, rules)).collect()
    }

    fn judge(stat: RollingStat, rules: &AnomalyRules) -> Verdict {
        let Some(z) = stat.zscore else {
            return Verdict {
                stat,
                is_anomalous: false,
                alertable: false,
                severity: None,
            };
        };

        let is_anomalous = z.abs() >= rules.threshold;
        let alertable = is_anomalous
            && match rules.direction {
                Direction::Increase => z > 0.0,
                Direction::Both => true,
            };

        Verdict {
            stat,
            is_anomalous,
            alertable,
            severity: is_anomalous.then(|| rules.severity.classify(z.abs())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn stats(zscores: &[Option<f64>]) -> Vec<RollingStat> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        zscores
            .iter()
            .enumerate()
            .map(|(i, z)| RollingStat {
                bucket: start + Duration::days(i as i64),
                value: 0.0,
                mean: z.map(|_| 0.0),
                stddev: z.map(|_| 1.0),
                zscore: *z,
            })
            .collect()
    }

    #[test]
    fn test_null_score_never_anomalous() {
        let verdicts = AnomalyEvaluator::evaluate(&stats(&[None]), &AnomalyRules::default());
        assert!(!verdicts[0].is_anomalous);
        assert!(verdicts[0].severity.is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let verdicts =
            AnomalyEvaluator::evaluate(&stats(&[Some(2.0), Some(1.99)]), &AnomalyRules::default());
        assert!(verdicts[0].is_anomalous);
        assert_eq!(verdicts[0].severity, Some(Severity::Warn));
        assert!(!verdicts[1].is_anomalous);
    }

    #[test]
    fn test_increase_only_ignores_drops() {
        let verdicts =
            AnomalyEvaluator::evaluate(&stats(&[Some(3.0), Some(-3.0)]), &AnomalyRules::default());
        assert!(verdicts[0].alertable);
        assert!(verdicts[1].is_anomalous, "drop must still be recorded");
        assert!(!verdicts[1].alertable, "drop must not alert");
    }

    #[test]
    fn test_both_directions_alert_on_drops() {
        let rules = AnomalyRules {
            direction: Direction::Both,
            ..Default::default()
        };
        let verdicts = AnomalyEvaluator::evaluate(&stats(&[Some(-3.0)]), &rules);
        assert!(verdicts[0].alertable);
    }

    #[test]
    fn test_severity_is_monotone() {
        let rules = AnomalyRules {
            threshold: 1.0,
            ..Default::default()
        };
        let verdicts = AnomalyEvaluator::evaluate(
            &stats(&[Some(1.5), Some(2.5), Some(3.5), Some(f64::INFINITY)]),
            &rules,
        );
        let severities: Vec<_> = verdicts.iter().map(|v| v.severity.unwrap()).collect();
        assert_eq!(
            severities,
            vec![
                Severity::Info,
                Severity::Warn,
                Severity::Critical,
                Severity::Critical
            ]
        );
        assert!(severities.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_breakpoint_validation() {
        let bad = SeverityBreakpoints {
            warn: 4.0,
            critical: 3.0,
        };
        assert!(bad.validate().is_err());
        assert!(SeverityBreakpoints::default().validate().is_ok());
    }
}
