//! Persistence seams consumed by the automation worker.
//!
//! The engine itself never performs I/O; the executor loads everything
//! through these traits, runs the pass in memory and writes back.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AutomationLog, AutomationRule, Quote};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Holds the quote collection.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Quote>, StoreError>;

    /// Inserts or replaces the quote with the same id.
    async fn upsert(&self, quote: &Quote) -> Result<(), StoreError>;

    /// Returns true if a quote was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Holds the user's automation rule configuration.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// `None` when the user never saved a configuration.
    async fn load_rules(&self) -> Result<Option<Vec<AutomationRule>>, StoreError>;

    async fn save_rules(&self, rules: &[AutomationRule]) -> Result<(), StoreError>;
}

/// Holds the execution log. Callers apply the cap before saving.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Entries oldest first.
    async fn load_log(&self) -> Result<Vec<AutomationLog>, StoreError>;

    /// Replaces the stored log with `entries`.
    async fn save_log(&self, entries: &[AutomationLog]) -> Result<(), StoreError>;
}

/// Holds the day-gate marker.
#[async_trait]
pub trait RunMarkerStore: Send + Sync {
    async fn get_last_run_date(&self) -> Result<Option<NaiveDate>, StoreError>;

    async fn set_last_run_date(&self, date: NaiveDate) -> Result<(), StoreError>;
}
