use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::TransitionError;
use crate::models::{PaymentStatus, Quote, QuoteStatus};

/// Transition table for a lifecycle state.
///
/// Quote status follows `draft -> sent -> {accepted, rejected, expired}`.
/// Payment follows `unpaid -> partial -> paid`, with `unpaid -> paid` as a
/// shortcut and a reset back to `unpaid` from `partial` or `paid`.
pub trait Transition: Copy + Eq + fmt::Display {
    /// Returns whether moving from `self` to `next` is a legal step.
    ///
    /// Staying in the same state is always legal.
    fn can_transition_to(self, next: Self) -> bool;

    /// Initial state for a new record.
    fn initial_state() -> Self;
}

impl Transition for QuoteStatus {
    fn can_transition_to(self, next: Self) -> bool {
        use QuoteStatus::*;
        self == next
            || matches!(
                (self, next),
                (Draft, Sent) | (Sent, Accepted) | (Sent, Rejected) | (Sent, Expired)
            )
    }

    fn initial_state() -> Self {
        QuoteStatus::Draft
    }
}

impl Transition for PaymentStatus {
    fn can_transition_to(self, next: Self) -> bool {
        use PaymentStatus::*;
        self == next
            || matches!(
                (self, next),
                (Unpaid, Partial)
                    | (Partial, Paid)
                    | (Unpaid, Paid)
                    | (Paid, Unpaid)
                    | (Partial, Unpaid)
            )
    }

    fn initial_state() -> Self {
        PaymentStatus::Unpaid
    }
}

/// How requests that fall outside the transition table are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Apply the request anyway and log a warning.
    #[default]
    Permissive,
    /// Reject the request with a [`TransitionError`].
    Strict,
}

/// A requested payment change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentChange {
    /// Correction back to unpaid; clears amount and date
    Unpaid,
    /// Partial payment of the given amount
    Partial(Decimal),
    /// Full payment; amount defaults to the quote total
    Paid(Option<Decimal>),
}

impl PaymentChange {
    pub fn target(self) -> PaymentStatus {
        match self {
            PaymentChange::Unpaid => PaymentStatus::Unpaid,
            PaymentChange::Partial(_) => PaymentStatus::Partial,
            PaymentChange::Paid(_) => PaymentStatus::Paid,
        }
    }
}

/// Result of an applied transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome<S> {
    pub from: S,
    pub to: S,
    /// False when the step was outside the table but applied permissively
    pub legal: bool,
}

impl<S: Transition> TransitionOutcome<S> {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Applies user-initiated status and payment changes to quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteStateMachine {
    policy: TransitionPolicy,
}

impl QuoteStateMachine {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Moves a quote to `to`.
    ///
    /// Accepting a quote initialises its payment status to `unpaid`.
    pub fn set_status(
        &self,
        quote: &mut Quote,
        to: QuoteStatus,
    ) -> Result<TransitionOutcome<QuoteStatus>, TransitionError> {
        let from = quote.status;
        let legal = from.can_transition_to(to);

        if !legal {
            match self.policy {
                TransitionPolicy::Strict => {
                    return Err(TransitionError::IllegalStatus { from, to });
                }
                TransitionPolicy::Permissive => {
                    warn!(
                        "Quote {}: applying out-of-table transition {} -> {}",
                        quote.number, from, to
                    );
                }
            }
        }

        quote.status = to;
        if to == QuoteStatus::Accepted && quote.payment_status.is_none() {
            quote.payment_status = Some(PaymentStatus::initial_state());
        }

        Ok(TransitionOutcome { from, to, legal })
    }

    /// Applies a payment change, setting `paid_amount` and `paid_date` as needed.
    pub fn set_payment(
        &self,
        quote: &mut Quote,
        change: PaymentChange,
        today: NaiveDate,
    ) -> Result<TransitionOutcome<PaymentStatus>, TransitionError> {
        if quote.status != QuoteStatus::Accepted {
            match self.policy {
                TransitionPolicy::Strict => return Err(TransitionError::NotAccepted(quote.status)),
                TransitionPolicy::Permissive => warn!(
                    "Quote {}: payment change on a {} quote",
                    quote.number, quote.status
                ),
            }
        }

        let from = quote.effective_payment_status();
        let to = change.target();
        let legal = from.can_transition_to(to);

        if !legal {
            match self.policy {
                TransitionPolicy::Strict => {
                    return Err(TransitionError::IllegalPayment { from, to });
                }
                TransitionPolicy::Permissive => {
                    warn!(
                        "Quote {}: applying out-of-table payment transition {} -> {}",
                        quote.number, from, to
                    );
                }
            }
        }

        match change {
            PaymentChange::Unpaid => {
                quote.paid_amount = None;
                quote.paid_date = None;
            }
            PaymentChange::Partial(amount) => {
                quote.paid_amount = Some(amount);
            }
            PaymentChange::Paid(amount) => {
                quote.paid_amount = Some(amount.unwrap_or_else(|| quote.total()));
                if quote.paid_date.is_none() {
                    quote.paid_date = Some(today);
                }
            }
        }
        quote.payment_status = Some(to);

        Ok(TransitionOutcome { from, to, legal })
    }
}

/// Moves a lapsed `sent` quote to `expired`. Returns true if the quote changed.
///
/// Calling it again on an expired quote is a no-op.
pub fn expire_if_lapsed(quote: &mut Quote, today: NaiveDate) -> bool {
    if !quote.is_lapsed(today) {
        return false;
    }
    quote.status = QuoteStatus::Expired;
    info!("Quote {} expired (expiry date {:?})", quote.number, quote.expiry_date);
    true
}

/// Expires every lapsed `sent` quote and returns the ids that changed.
pub fn sweep_expired(quotes: &mut [Quote], today: NaiveDate) -> Vec<Uuid> {
    quotes
        .iter_mut()
        .filter_map(|quote| expire_if_lapsed(quote, today).then_some(quote.id))
        .collect()
}
