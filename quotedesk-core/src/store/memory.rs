use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AutomationLog, AutomationRule, Quote};
use crate::store::{LogStore, QuoteStore, RuleStore, RunMarkerStore};

#[derive(Debug, Default)]
struct MemoryState {
    quotes: Vec<Quote>,
    rules: Option<Vec<AutomationRule>>,
    log: Vec<AutomationLog>,
    last_run: Option<NaiveDate>,
}

/// In-process store used by tests and when no database is configured.
///
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with quotes.
    pub fn with_quotes(quotes: Vec<Quote>) -> Self {
        let state = MemoryState {
            quotes,
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<Quote>, StoreError> {
        Ok(self.state.read().await.quotes.clone())
    }

    async fn upsert(&self, quote: &Quote) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.quotes.iter().position(|q| q.id == quote.id) {
            Some(index) => state.quotes[index] = quote.clone(),
            None => state.quotes.push(quote.clone()),
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let before = state.quotes.len();
        state.quotes.retain(|q| q.id != id);
        Ok(state.quotes.len() != before)
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn load_rules(&self) -> Result<Option<Vec<AutomationRule>>, StoreError> {
        Ok(self.state.read().await.rules.clone())
    }

    async fn save_rules(&self, rules: &[AutomationRule]) -> Result<(), StoreError> {
        self.state.write().await.rules = Some(rules.to_vec());
        Ok(())
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn load_log(&self) -> Result<Vec<AutomationLog>, StoreError> {
        Ok(self.state.read().await.log.clone())
    }

    async fn save_log(&self, entries: &[AutomationLog]) -> Result<(), StoreError> {
        self.state.write().await.log = entries.to_vec();
        Ok(())
    }
}

#[async_trait]
impl RunMarkerStore for MemoryStore {
    async fn get_last_run_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        Ok(self.state.read().await.last_run)
    }

    async fn set_last_run_date(&self, date: NaiveDate) -> Result<(), StoreError> {
        self.state.write().await.last_run = Some(date);
        Ok(())
    }
}
