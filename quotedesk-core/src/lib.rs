//! Quote lifecycle and automation rule engine.
//!
//! Quotes move through `draft -> sent -> {accepted, rejected, expired}`, with a
//! payment sub-state once accepted. A daily pass matches configured automation
//! rules against every quote and records what fired in a capped, deduplicated
//! execution log. Delivery of emails is left to an external sender that reads
//! the pending log entries.

pub mod automation;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod state_machine;
pub mod store;
pub mod worker;
