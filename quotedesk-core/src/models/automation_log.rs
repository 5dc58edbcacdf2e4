use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::rule::Channel;

/// Outcome recorded for a fired action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum LogStatus {
    #[sqlx(rename = "sent")]
    Sent,
    #[sqlx(rename = "failed")]
    Failed,
    #[sqlx(rename = "pending")]
    Pending,
    #[sqlx(rename = "skipped")]
    Skipped,
}

/// Builds the dedup key identifying one firing of a rule.
///
/// `{ruleId}_{quoteId}_{date}` for per-quote rules, `{ruleId}_{date}` otherwise.
pub fn dedup_key(rule_id: &str, quote_id: Option<Uuid>, date: NaiveDate) -> String {
    let day = date.format("%Y-%m-%d");
    match quote_id {
        Some(quote_id) => format!("{}_{}_{}", rule_id, quote_id, day),
        None => format!("{}_{}", rule_id, day),
    }
}

/// One fired action in the execution log.
///
/// Entries are written once and never mutated. Rule and quote fields are
/// snapshots taken at firing time so history survives renames and deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AutomationLog {
    /// Dedup key, see [`dedup_key`]
    pub id: String,

    pub rule_id: String,

    pub rule_name: String,

    pub quote_id: Option<Uuid>,

    pub quote_number: Option<String>,

    pub client_name: Option<String>,

    /// Human readable description of the action
    pub action: String,

    /// Rendered notification body, when the rule has a template
    #[serde(default)]
    pub message: Option<String>,

    pub status: LogStatus,

    pub channel: Channel,

    #[sqlx(rename = "fired_at")]
    pub timestamp: DateTime<Utc>,
}

impl AutomationLog {
    /// Whether an external sender still has to deliver this entry.
    pub fn awaits_delivery(&self) -> bool {
        self.status == LogStatus::Pending && self.channel.needs_delivery()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_with_quote() {
        let quote_id = Uuid::nil();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        assert_eq!(
            dedup_key("follow_up_7", Some(quote_id), date),
            "follow_up_7_00000000-0000-0000-0000-000000000000_2024-03-05"
        );
    }

    #[test]
    fn test_dedup_key_without_quote() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(dedup_key("weekly_report", None, date), "weekly_report_2024-03-04");
    }
}
