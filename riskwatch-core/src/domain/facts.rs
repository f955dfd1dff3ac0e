// riskwatch-core/src/domain/facts.rs
//
// Raw facts the engine reads. Intake owns them; the engine never mutates them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::prediction::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    Acknowledged,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Acknowledged => "acknowledged",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub customer_id: Option<String>,
    pub content: String,
    pub queue: Option<String>,
    pub ticket_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: TicketStatus,
}

/// Auth, billing or product event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub ts: NaiveDateTime,
    pub event_type: String,
    pub customer_id: Option<String>,
    pub service: Option<String>,
    pub value: f64,
}

/// Human correction kept for retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub ticket_id: i64,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub note: Option<String>,
}
