use chrono::NaiveDate;

use crate::automation::template::format_date;
use crate::models::{Quote, QuoteStatus, Reminder, ReminderType, Urgency};

/// Reminders for quotes expiring within this many days.
pub const EXPIRING_SOON_DAYS: i64 = 3;

/// Reminders for sent quotes with no answer after this many days.
pub const FOLLOW_UP_AFTER_DAYS: i64 = 7;

/// Derives UI reminders from the live quote list.
///
/// Pure and recomputed on every call; nothing is gated or logged. Each quote
/// runs three independent checks, so it can yield up to three reminders.
/// Output is ordered by urgency, keeping quote order within the same urgency.
pub fn derive_reminders(quotes: &[Quote], today: NaiveDate) -> Vec<Reminder> {
    let mut reminders: Vec<Reminder> = quotes
        .iter()
        .filter(|quote| quote.status == QuoteStatus::Sent)
        .flat_map(|quote| {
            [
                expired(quote, today),
                expiring_soon(quote, today),
                follow_up(quote, today),
            ]
        })
        .flatten()
        .collect();

    reminders.sort_by_key(|r| r.urgency);
    reminders
}

fn expired(quote: &Quote, today: NaiveDate) -> Option<Reminder> {
    let expiry = quote.expiry_date.filter(|expiry| *expiry < today)?;
    Some(Reminder::new(
        quote.id,
        ReminderType::Expired,
        Urgency::High,
        format!(
            "Il preventivo {} per {} è scaduto il {}",
            quote.number,
            quote.display_client(),
            format_date(expiry)
        ),
    ))
}

fn expiring_soon(quote: &Quote, today: NaiveDate) -> Option<Reminder> {
    let days = quote.days_until_expiry(today)?;
    if !(1..=EXPIRING_SOON_DAYS).contains(&days) {
        return None;
    }
    let when = if days == 1 {
        "domani".to_string()
    } else {
        format!("tra {} giorni", days)
    };
    Some(Reminder::new(
        quote.id,
        ReminderType::ExpiringSoon,
        Urgency::Medium,
        format!("Il preventivo {} per {} scade {}", quote.number, quote.display_client(), when),
    ))
}

fn follow_up(quote: &Quote, today: NaiveDate) -> Option<Reminder> {
    let days = quote.days_since_issued(today);
    if days < FOLLOW_UP_AFTER_DAYS {
        return None;
    }
    Some(Reminder::new(
        quote.id,
        ReminderType::FollowUp,
        Urgency::Low,
        format!(
            "Nessuna risposta da {} per il preventivo {} da {} giorni",
            quote.display_client(),
            quote.number,
            days
        ),
    ))
}
