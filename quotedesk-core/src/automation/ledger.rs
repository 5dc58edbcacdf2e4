use std::collections::HashSet;

use crate::models::AutomationLog;

/// Number of entries kept when no cap is configured.
pub const DEFAULT_LOG_CAP: usize = 200;

/// Append-only, capped record of fired actions.
///
/// Entry ids are dedup keys, so the ledger doubles as the idempotency check
/// for the rule engine. Oldest entries are evicted first once `cap` is reached.
#[derive(Debug, Clone)]
pub struct ExecutionLog {
    entries: Vec<AutomationLog>,
    keys: HashSet<String>,
    cap: usize,
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAP)
    }
}

impl ExecutionLog {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            keys: HashSet::new(),
            cap,
        }
    }

    /// Rebuilds a ledger from persisted entries, oldest first.
    pub fn from_entries(entries: Vec<AutomationLog>, cap: usize) -> Self {
        let mut log = Self::new(cap);
        log.append(entries);
        log
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Appends entries and evicts the oldest ones beyond the cap.
    pub fn append(&mut self, entries: impl IntoIterator<Item = AutomationLog>) {
        for entry in entries {
            self.keys.insert(entry.id.clone());
            self.entries.push(entry);
        }

        if self.entries.len() > self.cap {
            let overflow = self.entries.len() - self.cap;
            for evicted in self.entries.drain(..overflow) {
                self.keys.remove(&evicted.id);
            }
        }
    }

    pub fn entries(&self) -> &[AutomationLog] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Entries waiting for the external email sender.
    pub fn pending_deliveries(&self) -> impl Iterator<Item = &AutomationLog> {
        self.entries.iter().filter(|entry| entry.awaits_delivery())
    }

    pub fn into_entries(self) -> Vec<AutomationLog> {
        self.entries
    }
}
