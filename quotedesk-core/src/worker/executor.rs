use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::automation::{
    default_catalog, derive_reminders, record_runs, DayGate, EngineState, EvaluationClock,
    ExecutionLog, QuoteEvent, RuleEngine,
};
use crate::error::StoreError;
use crate::models::{
    AutomationLog, AutomationRule, PaymentStatus, Quote, QuoteItem, QuoteStatus, Reminder,
};
use crate::state_machine::{sweep_expired, PaymentChange, QuoteStateMachine};
use crate::store::{LogStore, QuoteStore, RuleStore, RunMarkerStore};

/// The four persistence seams the executor works through.
#[derive(Clone)]
pub struct Stores {
    pub quotes: Arc<dyn QuoteStore>,
    pub rules: Arc<dyn RuleStore>,
    pub log: Arc<dyn LogStore>,
    pub marker: Arc<dyn RunMarkerStore>,
}

impl Stores {
    /// Uses one backend for every seam.
    pub fn shared<S>(store: S) -> Self
    where
        S: QuoteStore + RuleStore + LogStore + RunMarkerStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            quotes: store.clone(),
            rules: store.clone(),
            log: store.clone(),
            marker: store,
        }
    }
}

/// Outcome of one daily pass.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// True when the day-gate was already closed for today
    pub skipped: bool,
    pub fired: Vec<AutomationLog>,
    /// Quotes moved from `sent` to `expired` by the sweep
    pub expired: Vec<Uuid>,
}

/// Runs the automation pass and user-initiated transitions against the stores.
pub struct AutomationExecutor {
    stores: Stores,
    engine: RuleEngine,
    machine: QuoteStateMachine,
    log_cap: usize,
    expiry_days: u32,
}

impl AutomationExecutor {
    /// Creates a new automation executor.
    ///
    /// # Arguments
    ///
    /// * `stores` - Persistence seams for quotes, rules, the log and the run marker
    /// * `engine` - Rule engine carrying the company name used in messages
    /// * `machine` - State machine applying the configured transition policy
    /// * `log_cap` - Number of execution log entries kept
    ///
    /// # Returns
    ///
    /// Returns a new `AutomationExecutor` with a 30 day expiry window.
    pub fn new(
        stores: Stores,
        engine: RuleEngine,
        machine: QuoteStateMachine,
        log_cap: usize,
    ) -> Self {
        Self {
            stores,
            engine,
            machine,
            log_cap,
            expiry_days: 30,
        }
    }

    /// Sets the expiry window applied by [`AutomationExecutor::create_quote`].
    pub fn with_expiry_days(mut self, days: u32) -> Self {
        self.expiry_days = days;
        self
    }

    /// Runs the daily pass.
    ///
    /// 1. Reads the day-gate marker and returns early if a pass already ran today
    /// 2. Loads quotes, rules (default catalog if none saved) and the execution log
    /// 3. Evaluates every rule against every quote
    /// 4. Expires lapsed `sent` quotes
    /// 5. Saves log, rule statistics and the marker
    ///
    /// Only a failure to read quotes aborts the pass. Every other store
    /// failure is logged and ignored; a missed marker write means the pass
    /// may run again, which the dedup keys make harmless.
    ///
    /// # Arguments
    ///
    /// * `clock` - The calendar day to evaluate and the timestamp for new entries
    ///
    /// # Returns
    ///
    /// Returns a `PassReport` with `skipped` set when the pass already ran on
    /// `clock.today`.
    ///
    /// # Errors
    ///
    /// Returns an error if the quotes cannot be loaded.
    #[instrument(skip(self, clock), fields(today = %clock.today))]
    pub async fn run_daily(&self, clock: EvaluationClock) -> Result<PassReport, anyhow::Error> {
        let last_run = match self.stores.marker.get_last_run_date().await {
            Ok(date) => date,
            Err(e) => {
                warn!("Could not read last run date, evaluating anyway: {}", e);
                None
            }
        };
        let gate = DayGate::new(last_run);

        if !gate.is_open(clock.today) {
            debug!("Daily pass already ran on {}", clock.today);
            return Ok(PassReport {
                skipped: true,
                ..PassReport::default()
            });
        }

        let mut quotes = self.stores.quotes.load_all().await?;
        let mut rules = self.load_rules().await;
        let ledger = self.load_ledger().await;

        let mut state = EngineState::new(ledger, gate);
        let fired = self.engine.evaluate(&mut state, &quotes, &rules, &clock);

        let expired = sweep_expired(&mut quotes, clock.today);
        for quote in quotes.iter().filter(|q| expired.contains(&q.id)) {
            if let Err(e) = self.stores.quotes.upsert(quote).await {
                warn!("Failed to persist expiry of quote {}: {}", quote.number, e);
            }
        }

        if record_runs(&mut rules, &fired, clock.timestamp) > 0 {
            self.save_rules(&rules).await;
        }
        self.save_ledger(&state.ledger).await;
        self.save_marker(clock.today).await;

        info!(
            "Daily pass complete: {} action(s) fired, {} quote(s) expired",
            fired.len(),
            expired.len()
        );

        Ok(PassReport {
            skipped: false,
            fired,
            expired,
        })
    }

    /// Creates and stores a draft quote expiring `expiry_days` after `date`.
    pub async fn create_quote(
        &self,
        number: &str,
        client_name: &str,
        date: NaiveDate,
        items: Vec<QuoteItem>,
    ) -> Result<Quote, anyhow::Error> {
        let quote = Quote::new(number, client_name, date, self.expiry_days).with_items(items);
        self.stores.quotes.upsert(&quote).await?;
        info!("Created quote {} for {}", quote.number, quote.client_name);
        Ok(quote)
    }

    /// Applies a status change requested by the user and fires `quote_accepted` rules.
    ///
    /// # Arguments
    ///
    /// * `quote_id` - The quote to update
    /// * `to` - Requested status
    /// * `clock` - Day and timestamp stamped on any fired entries
    ///
    /// # Returns
    ///
    /// Returns the updated quote and the entries fired by the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the quote does not exist, the strict policy rejects
    /// the transition, or the quote cannot be saved.
    #[instrument(skip(self, clock))]
    pub async fn update_status(
        &self,
        quote_id: Uuid,
        to: QuoteStatus,
        clock: EvaluationClock,
    ) -> Result<(Quote, Vec<AutomationLog>), anyhow::Error> {
        let mut quote = self.find_quote(quote_id).await?;
        let outcome = self.machine.set_status(&mut quote, to)?;
        self.stores.quotes.upsert(&quote).await?;

        info!("Quote {}: {} -> {}", quote.number, outcome.from, outcome.to);

        let fired = if outcome.changed() && to == QuoteStatus::Accepted {
            self.fire_event(QuoteEvent::Accepted, &quote, &clock).await
        } else {
            Vec::new()
        };

        Ok((quote, fired))
    }

    /// Applies a payment change and fires `payment_received` rules once fully paid.
    ///
    /// # Arguments
    ///
    /// * `quote_id` - The quote being paid
    /// * `change` - Target payment state, with the amount where relevant
    /// * `clock` - Day used for `paid_date` and stamped on fired entries
    ///
    /// # Returns
    ///
    /// Returns the updated quote and the entries fired by the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the quote does not exist, is not accepted under the
    /// strict policy, or cannot be saved.
    #[instrument(skip(self, clock))]
    pub async fn record_payment(
        &self,
        quote_id: Uuid,
        change: PaymentChange,
        clock: EvaluationClock,
    ) -> Result<(Quote, Vec<AutomationLog>), anyhow::Error> {
        let mut quote = self.find_quote(quote_id).await?;
        let outcome = self.machine.set_payment(&mut quote, change, clock.today)?;
        self.stores.quotes.upsert(&quote).await?;

        info!("Quote {}: payment {} -> {}", quote.number, outcome.from, outcome.to);

        let fired = if outcome.changed() && outcome.to == PaymentStatus::Paid {
            self.fire_event(QuoteEvent::PaymentReceived, &quote, &clock).await
        } else {
            Vec::new()
        };

        Ok((quote, fired))
    }

    /// Current reminders over the live quote list.
    pub async fn reminders(&self, today: NaiveDate) -> Result<Vec<Reminder>, anyhow::Error> {
        let quotes = self.stores.quotes.load_all().await?;
        Ok(derive_reminders(&quotes, today))
    }

    async fn find_quote(&self, quote_id: Uuid) -> Result<Quote, StoreError> {
        self.stores
            .quotes
            .load_all()
            .await?
            .into_iter()
            .find(|q| q.id == quote_id)
            .ok_or(StoreError::QuoteNotFound(quote_id))
    }

    async fn fire_event(
        &self,
        event: QuoteEvent,
        quote: &Quote,
        clock: &EvaluationClock,
    ) -> Vec<AutomationLog> {
        let mut rules = self.load_rules().await;
        let mut ledger = self.load_ledger().await;

        let fired = self.engine.on_event(&mut ledger, event, quote, &rules, clock);
        if fired.is_empty() {
            return fired;
        }

        record_runs(&mut rules, &fired, clock.timestamp);
        self.save_rules(&rules).await;
        self.save_ledger(&ledger).await;
        fired
    }

    async fn load_rules(&self) -> Vec<AutomationRule> {
        match self.stores.rules.load_rules().await {
            Ok(Some(rules)) => rules,
            Ok(None) => {
                debug!("No saved rules, using the default catalog");
                default_catalog()
            }
            Err(e) => {
                warn!("Failed to load rules, using the default catalog: {}", e);
                default_catalog()
            }
        }
    }

    async fn load_ledger(&self) -> ExecutionLog {
        match self.stores.log.load_log().await {
            Ok(entries) => ExecutionLog::from_entries(entries, self.log_cap),
            Err(e) => {
                warn!("Failed to load execution log, starting empty: {}", e);
                ExecutionLog::new(self.log_cap)
            }
        }
    }

    async fn save_rules(&self, rules: &[AutomationRule]) {
        if let Err(e) = self.stores.rules.save_rules(rules).await {
            warn!("Failed to save rule statistics: {}", e);
        }
    }

    async fn save_ledger(&self, ledger: &ExecutionLog) {
        if let Err(e) = self.stores.log.save_log(ledger.entries()).await {
            warn!("Failed to save execution log: {}", e);
        }
    }

    async fn save_marker(&self, today: NaiveDate) {
        if let Err(e) = self.stores.marker.set_last_run_date(today).await {
            warn!("Failed to save last run date: {}", e);
        }
    }
}
