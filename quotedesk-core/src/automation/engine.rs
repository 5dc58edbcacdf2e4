use chrono::{DateTime, Local, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

use crate::automation::ledger::ExecutionLog;
use crate::automation::template::{quote_vars, render};
use crate::automation::triggers::{self, Firing};
use crate::models::{
    dedup_key, AutomationLog, AutomationRule, AutomationTrigger, Channel, LogStatus, Quote,
};

/// Once-per-calendar-day limiter for the evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayGate {
    last_run: Option<NaiveDate>,
}

impl DayGate {
    pub fn new(last_run: Option<NaiveDate>) -> Self {
        Self { last_run }
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }

    /// A pass may run unless one already ran on `today`.
    pub fn is_open(&self, today: NaiveDate) -> bool {
        self.last_run != Some(today)
    }

    pub fn close(&mut self, today: NaiveDate) {
        self.last_run = Some(today);
    }
}

/// Engine state carried between passes: the ledger and the day-gate marker.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub ledger: ExecutionLog,
    pub gate: DayGate,
}

impl EngineState {
    pub fn new(ledger: ExecutionLog, gate: DayGate) -> Self {
        Self { ledger, gate }
    }
}

/// The calendar day a pass runs for, and the timestamp stamped on its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationClock {
    pub today: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

impl EvaluationClock {
    /// Uses the local calendar day, since expiry dates are local dates.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            today: now.date_naive(),
            timestamp: now.with_timezone(&Utc),
        }
    }

    pub fn at(today: NaiveDate, timestamp: DateTime<Utc>) -> Self {
        Self { today, timestamp }
    }
}

/// Events raised synchronously by user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteEvent {
    Accepted,
    PaymentReceived,
}

impl QuoteEvent {
    pub fn trigger(self) -> AutomationTrigger {
        match self {
            QuoteEvent::Accepted => AutomationTrigger::QuoteAccepted,
            QuoteEvent::PaymentReceived => AutomationTrigger::PaymentReceived,
        }
    }
}

/// Joins the rule catalog with the quote collection and decides what fires.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    company_name: String,
}

impl RuleEngine {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
        }
    }

    /// Runs the daily pass.
    ///
    /// Returns nothing when a pass already ran today. Otherwise every enabled
    /// rule is matched against every quote, entries whose dedup key is already
    /// in the ledger are skipped, new entries are appended to the ledger and
    /// the gate is closed for `clock.today`, even when nothing fired.
    #[instrument(skip_all, fields(today = %clock.today))]
    pub fn evaluate(
        &self,
        state: &mut EngineState,
        quotes: &[Quote],
        rules: &[AutomationRule],
        clock: &EvaluationClock,
    ) -> Vec<AutomationLog> {
        if !state.gate.is_open(clock.today) {
            debug!("Automation pass already ran today, skipping");
            return Vec::new();
        }

        let mut fired = Vec::new();
        let mut seen = HashSet::new();

        for rule in rules.iter().filter(|r| r.enabled) {
            if rule.trigger.is_event_driven() {
                continue;
            }

            if rule.trigger.is_aggregate() {
                let key = dedup_key(&rule.id, None, clock.today);
                if state.ledger.contains(&key) || !seen.insert(key.clone()) {
                    debug!("Rule {} already fired today", rule.id);
                    continue;
                }
                if let Some(firing) = triggers::weekly_report(quotes, clock.today) {
                    fired.push(self.build_entry(key, rule, None, firing, clock));
                }
                continue;
            }

            for quote in quotes {
                let key = dedup_key(&rule.id, Some(quote.id), clock.today);
                if state.ledger.contains(&key) || seen.contains(&key) {
                    debug!("Rule {} already fired today for quote {}", rule.id, quote.number);
                    continue;
                }
                if let Some(firing) = triggers::match_quote(rule, quote, clock.today) {
                    seen.insert(key.clone());
                    fired.push(self.build_entry(key, rule, Some(quote), firing, clock));
                }
            }
        }

        for entry in &fired {
            info!("Rule '{}' fired: {}", entry.rule_name, entry.action);
        }
        info!("Automation pass fired {} action(s)", fired.len());

        state.ledger.append(fired.iter().cloned());
        state.gate.close(clock.today);
        fired
    }

    /// Fires the enabled rules watching `event` for `quote`.
    ///
    /// Not day-gated; a rule fires at most once per quote per day.
    pub fn on_event(
        &self,
        ledger: &mut ExecutionLog,
        event: QuoteEvent,
        quote: &Quote,
        rules: &[AutomationRule],
        clock: &EvaluationClock,
    ) -> Vec<AutomationLog> {
        let trigger = event.trigger();
        let Some(action) = triggers::event_action(trigger, quote) else {
            return Vec::new();
        };

        let fired: Vec<AutomationLog> = rules
            .iter()
            .filter(|r| r.enabled && r.trigger == trigger)
            .filter_map(|rule| {
                let key = dedup_key(&rule.id, Some(quote.id), clock.today);
                if ledger.contains(&key) {
                    return None;
                }
                let firing = Firing {
                    days: None,
                    action: action.clone(),
                };
                Some(self.build_entry(key, rule, Some(quote), firing, clock))
            })
            .collect();

        for entry in &fired {
            info!("Rule '{}' fired on {:?}: {}", entry.rule_name, event, entry.action);
        }

        ledger.append(fired.iter().cloned());
        fired
    }

    fn build_entry(
        &self,
        key: String,
        rule: &AutomationRule,
        quote: Option<&Quote>,
        firing: Firing,
        clock: &EvaluationClock,
    ) -> AutomationLog {
        let status = match rule.channel {
            Channel::Internal => LogStatus::Sent,
            Channel::Email | Channel::Both => LogStatus::Pending,
        };

        let message = rule.email_template.as_deref().map(|template| {
            let mut vars = match quote {
                Some(quote) => quote_vars(quote, &self.company_name, firing.days),
                None => HashMap::from([("company_name".to_string(), self.company_name.clone())]),
            };
            vars.insert("action".to_string(), firing.action.clone());
            render(template, &vars)
        });

        AutomationLog {
            id: key,
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            quote_id: quote.map(|q| q.id),
            quote_number: quote.map(|q| q.number.clone()),
            client_name: quote.map(|q| q.display_client().to_string()),
            action: firing.action,
            message,
            status,
            channel: rule.channel,
            timestamp: clock.timestamp,
        }
    }
}

/// Bumps `run_count` and `last_run` for every rule that produced entries.
///
/// Returns the number of rules updated.
pub fn record_runs(
    rules: &mut [AutomationRule],
    fired: &[AutomationLog],
    timestamp: DateTime<Utc>,
) -> usize {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for entry in fired {
        *counts.entry(entry.rule_id.as_str()).or_default() += 1;
    }

    let mut updated = 0;
    for rule in rules.iter_mut() {
        if let Some(count) = counts.get(rule.id.as_str()) {
            rule.run_count += count;
            rule.last_run = Some(timestamp);
            updated += 1;
        }
    }
    updated
}
