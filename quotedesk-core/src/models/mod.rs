pub mod automation_log;
pub mod quote;
pub mod reminder;
pub mod rule;

pub use automation_log::{dedup_key, AutomationLog, LogStatus};
pub use quote::{PaymentStatus, Quote, QuoteItem, QuoteStatus};
pub use reminder::{Reminder, ReminderType, Urgency};
pub use rule::{AutomationRule, AutomationTrigger, Channel, TargetAudience};
