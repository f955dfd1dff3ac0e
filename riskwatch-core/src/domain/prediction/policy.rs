// riskwatch-core/src/domain/prediction/policy.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyName {
    #[default]
    Balanced,
    Safety,
}

impl PolicyName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Safety => "safety",
        }
    }
}

impl std::str::FromStr for PolicyName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "safety" => Ok(Self::Safety),
            _ => Err(format!("Unknown prediction policy: {}", s)),
        }
    }
}

/// Resolved policy, parameters included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictionPolicy {
    /// Trust the classifier's argmax.
    Balanced,
    /// Force `high` once `prob_high >= threshold_high`.
    Safety { threshold_high: f64 },
}

impl PredictionPolicy {
    pub fn name(&self) -> PolicyName {
        match self {
            Self::Balanced => PolicyName::Balanced,
            Self::Safety { .. } => PolicyName::Safety,
        }
    }

    pub fn threshold_high(&self) -> Option<f64> {
        match self {
            Self::Balanced => None,
            Self::Safety { threshold_high } => Some(*threshold_high),
        }
    }

    /// Final priority for one classifier output.
    pub fn select_priority(
        &self,
        argmax: Priority,
        prob_high: Option<f64>,
    ) -> Result<Priority, DomainError> {
        if let Some(p) = prob_high
            && !(0.0..=1.0).contains(&p)
        {
            return Err(DomainError::Configuration(format!(
                "probability of 'high' must lie in [0, 1], got {}",
                p
            )));
        }

        match self {
            Self::Balanced => Ok(argmax),
            Self::Safety { threshold_high } => {
                let p = prob_high.ok_or_else(|| {
                    DomainError::Configuration(
                        "safety policy requires the probability of 'high' from the classifier"
                            .into(),
                    )
                })?;
                if p >= *threshold_high {
                    Ok(Priority::High)
                } else {
                    Ok(argmax)
                }
            }
        }
    }
}

/// `prediction:` section of the project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PredictionConfig {
    #[serde(default)]
    pub policy: PolicyName,
    /// Required iff `policy: safety`.
    #[serde(default)]
    pub threshold_high: Option<f64>,
    #[validate(length(min = 1))]
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[validate(length(min = 1))]
    #[serde(default = "default_model_version")]
    pub model_version: String,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            policy: PolicyName::default(),
            threshold_high: None,
            model_name: default_model_name(),
            model_version: default_model_version(),
        }
    }
}

impl PredictionConfig {
    /// Turns the raw options into a policy, rejecting incomplete safety settings.
    pub fn resolve(&self) -> Result<PredictionPolicy, DomainError> {
        match self.policy {
            PolicyName::Balanced => Ok(PredictionPolicy::Balanced),
            PolicyName::Safety => {
                let threshold_high = self.threshold_high.ok_or_else(|| {
                    DomainError::Configuration("policy 'safety' requires 'threshold_high'".into())
                })?;
                if !(0.0..=1.0).contains(&threshold_high) {
                    return Err(DomainError::Configuration(format!(
                        "threshold_high must lie in [0, 1], got {}",
                        threshold_high
                    )));
                }
                Ok(PredictionPolicy::Safety { threshold_high })
            }
        }
    }
}

fn default_model_name() -> String {
    "triage-classifier".to_string()
}
fn default_model_version() -> String {
    "unversioned".to_string()
}
