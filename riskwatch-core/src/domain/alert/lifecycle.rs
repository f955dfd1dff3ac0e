// riskwatch-core/src/domain/alert/lifecycle.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

// Variant order follows the lifecycle, so `Open < Acknowledged < Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Closed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Acknowledged => "acknowledged",
            Self::Closed => "closed",
        }
    }

    /// Open or acknowledged: the alert still holds its natural key.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Validates `self -> target`.
    ///
    /// Returns `Ok(false)` for a no-op (already in `target`), `Ok(true)` when the status changes.
    pub fn transition(self, target: AlertStatus) -> Result<bool, DomainError> {
        match (self, target) {
            (from, to) if from == to => Ok(false),
            (Self::Open, Self::Acknowledged)
            | (Self::Open, Self::Closed)
            | (Self::Acknowledged, Self::Closed) => Ok(true),
            (from, to) => Err(DomainError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            }),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "acknowledged" | "ack" => Ok(Self::Acknowledged),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Unknown alert status: {}", s)),
        }
    }
}
