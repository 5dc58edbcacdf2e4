use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    ExpiringSoon,
    Expired,
    FollowUp,
}

impl ReminderType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderType::ExpiringSoon => "expiring_soon",
            ReminderType::Expired => "expired",
            ReminderType::FollowUp => "follow_up",
        }
    }
}

/// Reminder urgency. Ordering puts `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

/// Ephemeral UI badge derived from the live quote list. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// `{quoteId}-{type}`, stable across renders
    pub id: String,
    pub quote_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReminderType,
    pub urgency: Urgency,
    pub message: String,
}

impl Reminder {
    pub fn new(quote_id: Uuid, kind: ReminderType, urgency: Urgency, message: String) -> Self {
        Self {
            id: format!("{}-{}", quote_id, kind.as_str()),
            quote_id,
            kind,
            urgency,
            message,
        }
    }
}
