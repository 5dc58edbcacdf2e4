use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;

use crate::automation::template::{format_amount, format_date};
use crate::models::{AutomationRule, AutomationTrigger, PaymentStatus, Quote, QuoteStatus};

/// A positive trigger match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    /// Day count that made the rule fire, exposed to templates as `{{days}}`
    pub days: Option<i64>,
    /// Human readable action recorded in the log
    pub action: String,
}

fn giorni(days: i64) -> String {
    if days == 1 {
        "1 giorno".to_string()
    } else {
        format!("{} giorni", days)
    }
}

/// Evaluates a per-quote trigger. Aggregate and event-driven triggers never match here.
pub fn match_quote(rule: &AutomationRule, quote: &Quote, today: NaiveDate) -> Option<Firing> {
    match rule.trigger {
        AutomationTrigger::QuoteExpiring => quote_expiring(rule, quote, today),
        AutomationTrigger::QuoteExpired => quote_expired(quote, today),
        AutomationTrigger::FollowUp => follow_up(rule, quote, today),
        AutomationTrigger::PaymentOverdue => payment_overdue(rule, quote, today),
        AutomationTrigger::QuoteAccepted
        | AutomationTrigger::PaymentReceived
        | AutomationTrigger::WeeklyReport => None,
    }
}

/// Fires on the exact day `delay_days` before expiry.
fn quote_expiring(rule: &AutomationRule, quote: &Quote, today: NaiveDate) -> Option<Firing> {
    if quote.status != QuoteStatus::Sent {
        return None;
    }
    let days = quote.days_until_expiry(today)?;
    (days == rule.delay()).then(|| Firing {
        days: Some(days),
        action: format!(
            "Promemoria scadenza: il preventivo {} per {} scade tra {}",
            quote.number,
            quote.display_client(),
            giorni(days)
        ),
    })
}

/// Fires once, the day after the expiry date passes.
fn quote_expired(quote: &Quote, today: NaiveDate) -> Option<Firing> {
    if !quote.is_lapsed(today) {
        return None;
    }
    let expiry = quote.expiry_date?;
    let days = (today - expiry).num_days();
    (days == 1).then(|| Firing {
        days: Some(days),
        action: format!(
            "Preventivo {} per {} scaduto il {}",
            quote.number,
            quote.display_client(),
            format_date(expiry)
        ),
    })
}

/// Fires on the exact day `delay_days` after issuance.
fn follow_up(rule: &AutomationRule, quote: &Quote, today: NaiveDate) -> Option<Firing> {
    if quote.status != QuoteStatus::Sent {
        return None;
    }
    let days = quote.days_since_issued(today);
    (days == rule.delay()).then(|| Firing {
        days: Some(days),
        action: format!(
            "Follow-up preventivo {} per {}: inviato {} fa",
            quote.number,
            quote.display_client(),
            giorni(days)
        ),
    })
}

/// Fires every day from `delay_days` after issuance until the quote is paid.
///
/// Daily repeats are only held back by the dedup key.
fn payment_overdue(rule: &AutomationRule, quote: &Quote, today: NaiveDate) -> Option<Firing> {
    if quote.status != QuoteStatus::Accepted
        || quote.effective_payment_status() == PaymentStatus::Paid
    {
        return None;
    }
    let days = quote.days_since_issued(today);
    if days < rule.delay() {
        return None;
    }
    let outstanding = quote.total() - quote.paid_amount.unwrap_or(Decimal::ZERO);
    Some(Firing {
        days: Some(days),
        action: format!(
            "Sollecito pagamento preventivo {} per {}: {} dall'emissione, da incassare {}",
            quote.number,
            quote.display_client(),
            giorni(days),
            format_amount(outstanding)
        ),
    })
}

/// Aggregates the trailing seven days of quotes. Only fires on Mondays.
pub fn weekly_report(quotes: &[Quote], today: NaiveDate) -> Option<Firing> {
    if today.weekday() != Weekday::Mon {
        return None;
    }

    let recent: Vec<&Quote> = quotes
        .iter()
        .filter(|q| {
            let age = q.days_since_issued(today);
            (0..7).contains(&age)
        })
        .collect();

    let accepted: Vec<&&Quote> = recent
        .iter()
        .filter(|q| q.status == QuoteStatus::Accepted)
        .collect();
    let waiting = recent.iter().filter(|q| q.status == QuoteStatus::Sent).count();
    let accepted_value: Decimal = accepted.iter().map(|q| q.total()).sum();

    Some(Firing {
        days: Some(7),
        action: format!(
            "Report settimanale: {} preventivi emessi, {} accettati, {} in attesa, \
             valore accettato {}",
            recent.len(),
            accepted.len(),
            waiting,
            format_amount(accepted_value)
        ),
    })
}

/// Action text for event-driven triggers, `None` for any other trigger.
pub fn event_action(trigger: AutomationTrigger, quote: &Quote) -> Option<String> {
    match trigger {
        AutomationTrigger::QuoteAccepted => Some(format!(
            "Preventivo {} accettato da {} ({})",
            quote.number,
            quote.display_client(),
            format_amount(quote.total())
        )),
        AutomationTrigger::PaymentReceived => Some(format!(
            "Pagamento ricevuto per il preventivo {} da {}: {}",
            quote.number,
            quote.display_client(),
            format_amount(quote.paid_amount.unwrap_or_else(|| quote.total()))
        )),
        AutomationTrigger::QuoteExpiring
        | AutomationTrigger::QuoteExpired
        | AutomationTrigger::FollowUp
        | AutomationTrigger::PaymentOverdue
        | AutomationTrigger::WeeklyReport => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, TargetAudience};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(trigger: AutomationTrigger, delay_days: i32) -> AutomationRule {
        AutomationRule::new("test", trigger, delay_days, Channel::Email, TargetAudience::Client)
    }

    fn sent_quote(date: NaiveDate, window: u32) -> Quote {
        let mut quote = Quote::new("2024-020", "Mario Rossi", date, window);
        quote.status = QuoteStatus::Sent;
        quote
    }

    #[test]
    fn test_expiring_matches_exact_day_only() {
        let today = day(2024, 6, 10);
        let rule = rule(AutomationTrigger::QuoteExpiring, 3);

        for (offset, expected) in [(2, false), (3, true), (4, false)] {
            let mut quote = sent_quote(day(2024, 6, 1), 30);
            quote.expiry_date = today.checked_add_days(chrono::Days::new(offset));
            assert_eq!(match_quote(&rule, &quote, today).is_some(), expected, "offset {}", offset);
        }
    }

    #[test]
    fn test_expiring_ignores_unsent_quote() {
        let today = day(2024, 6, 10);
        let mut quote = sent_quote(day(2024, 6, 1), 12);
        quote.status = QuoteStatus::Draft;

        assert!(match_quote(&rule(AutomationTrigger::QuoteExpiring, 3), &quote, today).is_none());
    }

    #[test]
    fn test_expired_matches_day_after_expiry() {
        let quote = sent_quote(day(2024, 6, 1), 10);
        let rule = rule(AutomationTrigger::QuoteExpired, 0);

        assert!(match_quote(&rule, &quote, day(2024, 6, 11)).is_none());
        assert!(match_quote(&rule, &quote, day(2024, 6, 12)).is_some());
        assert!(match_quote(&rule, &quote, day(2024, 6, 13)).is_none());
    }

    #[test]
    fn test_follow_up_text_mentions_days() {
        let quote = sent_quote(day(2024, 6, 1), 30);
        let firing = match_quote(&rule(AutomationTrigger::FollowUp, 7), &quote, day(2024, 6, 8))
            .expect("follow-up should fire after 7 days");

        assert_eq!(firing.days, Some(7));
        assert!(firing.action.contains("7 giorni"));
    }

    #[test]
    fn test_payment_overdue_is_a_threshold() {
        let mut quote = sent_quote(day(2024, 1, 1), 30);
        quote.status = QuoteStatus::Accepted;
        let rule = rule(AutomationTrigger::PaymentOverdue, 30);

        assert!(match_quote(&rule, &quote, day(2024, 1, 30)).is_none());
        assert!(match_quote(&rule, &quote, day(2024, 1, 31)).is_some());
        assert!(match_quote(&rule, &quote, day(2024, 3, 15)).is_some());

        quote.payment_status = Some(PaymentStatus::Paid);
        assert!(match_quote(&rule, &quote, day(2024, 3, 15)).is_none());
    }

    #[test]
    fn test_event_triggers_never_match_in_daily_pass() {
        let quote = sent_quote(day(2024, 6, 1), 30);
        for trigger in [
            AutomationTrigger::QuoteAccepted,
            AutomationTrigger::PaymentReceived,
            AutomationTrigger::WeeklyReport,
        ] {
            assert!(match_quote(&rule(trigger, 0), &quote, day(2024, 6, 1)).is_none());
        }
    }

    #[test]
    fn test_weekly_report_only_on_monday() {
        let monday = day(2024, 6, 10);
        let quotes = vec![sent_quote(day(2024, 6, 5), 30)];

        let firing = weekly_report(&quotes, monday).expect("fires on Monday");
        assert!(firing.action.contains("1 preventivi emessi"));
        assert!(firing.action.contains("1 in attesa"));

        assert!(weekly_report(&quotes, day(2024, 6, 11)).is_none());
    }
}
