// riskwatch-core/src/domain/monitoring/level.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

/// Partition a metric series (and its alerts) applies to.
///
/// Rendered as `global`, `queue:<name>`, `tag:<name>` or `customer:<id>` in storage and on the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    Global,
    Queue(String),
    Tag(String),
    Customer(String),
}

/// The grouping column behind a non-global level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Queue,
    Tag,
    Customer,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Tag => "tag",
            Self::Customer => "customer",
        }
    }

    pub fn level(&self, value: impl Into<String>) -> Level {
        match self {
            Self::Queue => Level::Queue(value.into()),
            Self::Tag => Level::Tag(value.into()),
            Self::Customer => Level::Customer(value.into()),
        }
    }
}

impl Level {
    pub fn dimension(&self) -> Option<Dimension> {
        match self {
            Self::Global => None,
            Self::Queue(_) => Some(Dimension::Queue),
            Self::Tag(_) => Some(Dimension::Tag),
            Self::Customer(_) => Some(Dimension::Customer),
        }
    }

    /// Partition value (queue name, tag, customer id). `None` for the global level.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Queue(v) | Self::Tag(v) | Self::Customer(v) => Some(v),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Queue(v) => write!(f, "queue:{}", v),
            Self::Tag(v) => write!(f, "tag:{}", v),
            Self::Customer(v) => write!(f, "customer:{}", v),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("global") {
            return Ok(Self::Global);
        }
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| DomainError::InvalidLevel(s.to_string()))?;
        if value.is_empty() {
            return Err(DomainError::InvalidLevel(s.to_string()));
        }
        match kind.to_lowercase().as_str() {
            "queue" => Ok(Self::Queue(value.to_string())),
            "tag" => Ok(Self::Tag(value.to_string())),
            "customer" => Ok(Self::Customer(value.to_string())),
            _ => Err(DomainError::InvalidLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parsing_consistency() -> anyhow::Result<()> {
        let levels = [
            Level::Global,
            Level::Queue("billing".into()),
            Level::Tag("outage".into()),
            Level::Customer("c-42".into()),
        ];
        for level in levels {
            let parsed: Level = level.to_string().parse()?;
            assert_eq!(parsed, level);
        }
        Ok(())
    }

    #[test]
    fn test_value_may_contain_separator() -> anyhow::Result<()> {
        let level: Level = "tag:sev:1".parse()?;
        assert_eq!(level, Level::Tag("sev:1".into()));
        Ok(())
    }

    #[test]
    fn test_invalid_levels() {
        assert!("region:eu".parse::<Level>().is_err());
        assert!("queue:".parse::<Level>().is_err());
        assert!("queue".parse::<Level>().is_err());
    }
}
