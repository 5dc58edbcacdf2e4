use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Category of condition an automation rule watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum AutomationTrigger {
    #[sqlx(rename = "quote_expiring")]
    QuoteExpiring,
    #[sqlx(rename = "quote_expired")]
    QuoteExpired,
    #[sqlx(rename = "follow_up")]
    FollowUp,
    #[sqlx(rename = "payment_overdue")]
    PaymentOverdue,
    #[sqlx(rename = "quote_accepted")]
    QuoteAccepted,
    #[sqlx(rename = "payment_received")]
    PaymentReceived,
    #[sqlx(rename = "weekly_report")]
    WeeklyReport,
}

impl AutomationTrigger {
    /// Triggers fired by the UI at the moment of the event rather than by the daily pass.
    pub fn is_event_driven(self) -> bool {
        matches!(
            self,
            AutomationTrigger::QuoteAccepted | AutomationTrigger::PaymentReceived
        )
    }

    /// Triggers evaluated once per pass rather than per quote.
    pub fn is_aggregate(self) -> bool {
        matches!(self, AutomationTrigger::WeeklyReport)
    }
}

impl fmt::Display for AutomationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AutomationTrigger::QuoteExpiring => "quote_expiring",
            AutomationTrigger::QuoteExpired => "quote_expired",
            AutomationTrigger::FollowUp => "follow_up",
            AutomationTrigger::PaymentOverdue => "payment_overdue",
            AutomationTrigger::QuoteAccepted => "quote_accepted",
            AutomationTrigger::PaymentReceived => "payment_received",
            AutomationTrigger::WeeklyReport => "weekly_report",
        };
        f.write_str(name)
    }
}

/// Delivery channel declared by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum Channel {
    #[sqlx(rename = "email")]
    Email,
    #[sqlx(rename = "internal")]
    Internal,
    #[sqlx(rename = "both")]
    Both,
}

impl Channel {
    /// Whether an external sender has to pick the entry up.
    pub fn needs_delivery(self) -> bool {
        !matches!(self, Channel::Internal)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Internal => write!(f, "internal"),
            Channel::Both => write!(f, "both"),
        }
    }
}

/// Who a rule's notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum TargetAudience {
    #[sqlx(rename = "self")]
    #[serde(rename = "self")]
    Owner,
    #[sqlx(rename = "client")]
    Client,
    #[sqlx(rename = "team")]
    Team,
}

/// A user-authored automation rule.
///
/// The engine reads rules but only ever touches `run_count` and `last_run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    /// Stable identifier, part of every dedup key
    pub id: String,

    /// Display name, copied into log entries at firing time
    pub name: String,

    #[sqlx(rename = "trigger_kind")]
    pub trigger: AutomationTrigger,

    pub enabled: bool,

    /// Days threshold; meaning depends on the trigger
    pub delay_days: i32,

    pub channel: Channel,

    pub target_audience: TargetAudience,

    /// Notification body with `{{var}}` placeholders
    #[serde(default)]
    pub email_template: Option<String>,

    #[serde(default)]
    pub run_count: i64,

    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

impl AutomationRule {
    /// Creates an enabled rule with a fresh id.
    pub fn new(
        name: impl Into<String>,
        trigger: AutomationTrigger,
        delay_days: i32,
        channel: Channel,
        target_audience: TargetAudience,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            trigger,
            enabled: true,
            delay_days,
            channel,
            target_audience,
            email_template: None,
            run_count: 0,
            last_run: None,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.email_template = Some(template.into());
        self
    }

    /// Delay as a day count; negative values are treated as zero.
    pub fn delay(&self) -> i64 {
        i64::from(self.delay_days.max(0))
    }
}
