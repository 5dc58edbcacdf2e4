pub mod catalog;
pub mod engine;
pub mod ledger;
pub mod reminders;
pub mod template;
pub mod triggers;

#[cfg(test)]
mod tests;

pub use catalog::default_catalog;
pub use engine::{record_runs, DayGate, EngineState, EvaluationClock, QuoteEvent, RuleEngine};
pub use ledger::{ExecutionLog, DEFAULT_LOG_CAP};
pub use reminders::derive_reminders;
pub use template::render;
