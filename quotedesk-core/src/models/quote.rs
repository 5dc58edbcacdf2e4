use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::state_machine::Transition;

/// Quote status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum QuoteStatus {
    #[default]
    #[sqlx(rename = "draft")]
    Draft,
    #[sqlx(rename = "sent")]
    Sent,
    #[sqlx(rename = "accepted")]
    Accepted,
    #[sqlx(rename = "rejected")]
    Rejected,
    #[sqlx(rename = "expired")]
    Expired,
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteStatus::Draft => write!(f, "draft"),
            QuoteStatus::Sent => write!(f, "sent"),
            QuoteStatus::Accepted => write!(f, "accepted"),
            QuoteStatus::Rejected => write!(f, "rejected"),
            QuoteStatus::Expired => write!(f, "expired"),
        }
    }
}

/// Payment sub-state of an accepted quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum PaymentStatus {
    #[default]
    #[sqlx(rename = "unpaid")]
    Unpaid,
    #[sqlx(rename = "partial")]
    Partial,
    #[sqlx(rename = "paid")]
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::Partial => write!(f, "partial"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

/// A single line of a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Tax rate in percent (22 means 22%)
    #[serde(default)]
    pub tax_rate: Decimal,
}

impl QuoteItem {
    pub fn net(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    pub fn tax(&self) -> Decimal {
        self.net() * self.tax_rate / Decimal::ONE_HUNDRED
    }
}

/// Quote model, the central document of the sales lifecycle.
///
/// Records persisted before `status` existed deserialize as `Draft`.
/// `payment_status` is only meaningful once the quote is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Unique identifier for the quote
    pub id: Uuid,

    /// Human facing quote number (e.g. "2024-017")
    pub number: String,

    /// Client display name
    pub client_name: String,

    /// Client company, if any
    #[serde(default)]
    pub client_company: Option<String>,

    /// Client email address
    #[serde(default)]
    pub client_email: Option<String>,

    #[serde(default)]
    pub status: QuoteStatus,

    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,

    #[serde(default)]
    pub paid_amount: Option<Decimal>,

    #[serde(default)]
    pub paid_date: Option<NaiveDate>,

    /// Issuance date
    pub date: NaiveDate,

    /// Derived once at creation from `date` and the expiry window
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,

    #[serde(default)]
    pub items: Vec<QuoteItem>,
}

impl Quote {
    /// Creates a draft quote whose expiry date is `date + expiry_window_days`.
    pub fn new(
        number: impl Into<String>,
        client_name: impl Into<String>,
        date: NaiveDate,
        expiry_window_days: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            client_name: client_name.into(),
            client_company: None,
            client_email: None,
            status: QuoteStatus::initial_state(),
            payment_status: None,
            paid_amount: None,
            paid_date: None,
            date,
            expiry_date: date.checked_add_days(Days::new(u64::from(expiry_window_days))),
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<QuoteItem>) -> Self {
        self.items = items;
        self
    }

    /// Payment status with the `unpaid` default applied.
    pub fn effective_payment_status(&self) -> PaymentStatus {
        self.payment_status.unwrap_or_default()
    }

    /// Name used in rendered text: the company when present, else the person.
    pub fn display_client(&self) -> &str {
        self.client_company
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.client_name)
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(QuoteItem::net).sum()
    }

    pub fn tax_total(&self) -> Decimal {
        self.items.iter().map(QuoteItem::tax).sum()
    }

    pub fn total(&self) -> Decimal {
        (self.subtotal() + self.tax_total()).round_dp(2)
    }

    /// Whole days from `today` until expiry (negative once lapsed).
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|expiry| (expiry - today).num_days())
    }

    /// Whole days elapsed since the issuance date.
    pub fn days_since_issued(&self, today: NaiveDate) -> i64 {
        (today - self.date).num_days()
    }

    /// True when a sent quote has passed its expiry date.
    pub fn is_lapsed(&self, today: NaiveDate) -> bool {
        self.status == QuoteStatus::Sent && self.expiry_date.is_some_and(|expiry| expiry < today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: &str, price: &str, tax: &str) -> QuoteItem {
        QuoteItem {
            description: "Consulenza".to_string(),
            quantity: Decimal::from_str_exact(quantity).unwrap(),
            unit_price: Decimal::from_str_exact(price).unwrap(),
            tax_rate: Decimal::from_str_exact(tax).unwrap(),
        }
    }

    #[test]
    fn test_new_quote_derives_expiry_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let quote = Quote::new("2024-001", "Mario Rossi", date, 30);

        assert_eq!(quote.status, QuoteStatus::Draft);
        assert_eq!(quote.expiry_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_new_quote_starts_in_initial_state() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let quote = Quote::new("2024-005", "Mario Rossi", date, 30);

        assert_eq!(quote.status, QuoteStatus::initial_state());
        assert!(quote.status.can_transition_to(QuoteStatus::Sent));
    }

    #[test]
    fn test_totals_include_tax() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let quote = Quote::new("2024-002", "Mario Rossi", date, 30)
            .with_items(vec![item("2", "100.00", "22"), item("1", "50.00", "0")]);

        assert_eq!(quote.subtotal(), Decimal::from_str_exact("250.00").unwrap());
        assert_eq!(quote.tax_total(), Decimal::from_str_exact("44.00").unwrap());
        assert_eq!(quote.total(), Decimal::from_str_exact("294.00").unwrap());
    }

    #[test]
    fn test_legacy_record_defaults_to_draft() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "number": "2019-004",
            "clientName": "Bianchi Srl",
            "date": "2019-05-10",
        });

        let quote: Quote = serde_json::from_value(json).expect("legacy quote should parse");
        assert_eq!(quote.status, QuoteStatus::Draft);
        assert_eq!(quote.effective_payment_status(), PaymentStatus::Unpaid);
        assert!(quote.items.is_empty());
    }

    #[test]
    fn test_display_client_prefers_company() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut quote = Quote::new("2024-003", "Mario Rossi", date, 30);
        assert_eq!(quote.display_client(), "Mario Rossi");

        quote.client_company = Some("Rossi Impianti".to_string());
        assert_eq!(quote.display_client(), "Rossi Impianti");
    }
}
