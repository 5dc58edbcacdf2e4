use thiserror::Error;
use uuid::Uuid;

use crate::models::{PaymentStatus, QuoteStatus};

/// Errors raised by the persistence seams.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Quote not found: {0}")]
    QuoteNotFound(Uuid),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the quote lifecycle when transitions are enforced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Illegal status transition: {from} -> {to}")]
    IllegalStatus { from: QuoteStatus, to: QuoteStatus },

    #[error("Illegal payment transition: {from} -> {to}")]
    IllegalPayment { from: PaymentStatus, to: PaymentStatus },

    #[error("Payment change requires an accepted quote (status is {0})")]
    NotAccepted(QuoteStatus),
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
