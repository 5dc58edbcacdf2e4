use chrono::{Days, NaiveDate, TimeZone, Utc};

use crate::automation::engine::{
    record_runs, DayGate, EngineState, EvaluationClock, QuoteEvent, RuleEngine,
};
use crate::automation::ledger::ExecutionLog;
use crate::models::{
    AutomationRule, AutomationTrigger, Channel, LogStatus, PaymentStatus, Quote, QuoteStatus,
    TargetAudience,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn clock(today: NaiveDate) -> EvaluationClock {
    let timestamp = Utc
        .from_local_datetime(&today.and_hms_opt(9, 0, 0).unwrap())
        .unwrap();
    EvaluationClock::at(today, timestamp)
}

fn rule(id: &str, trigger: AutomationTrigger, delay_days: i32, channel: Channel) -> AutomationRule {
    let mut rule = AutomationRule::new(id, trigger, delay_days, channel, TargetAudience::Client);
    rule.id = id.to_string();
    rule
}

fn sent_quote(number: &str, issued: NaiveDate) -> Quote {
    let mut quote = Quote::new(number, "Mario Rossi", issued, 30);
    quote.status = QuoteStatus::Sent;
    quote
}

fn engine() -> RuleEngine {
    RuleEngine::new("Rossi Impianti")
}

/// Follow-up after 7 days fires once with the day count in the action text.
#[test]
fn test_follow_up_scenario() {
    let today = day(2024, 6, 12);
    let quotes = vec![sent_quote("2024-040", today - Days::new(7))];
    let rules = vec![rule("follow_up_7d", AutomationTrigger::FollowUp, 7, Channel::Email)];
    let mut state = EngineState::default();

    let fired = engine().evaluate(&mut state, &quotes, &rules, &clock(today));

    assert_eq!(fired.len(), 1);
    let entry = &fired[0];
    assert!(entry.action.contains("7 giorni"));
    assert_eq!(entry.status, LogStatus::Pending);
    assert_eq!(entry.id, format!("follow_up_7d_{}_2024-06-12", quotes[0].id));
    assert_eq!(entry.quote_number.as_deref(), Some("2024-040"));
    assert_eq!(state.ledger.len(), 1);
}

#[test]
fn test_internal_channel_is_sent_on_creation() {
    let today = day(2024, 6, 12);
    let quotes = vec![sent_quote("2024-041", today - Days::new(7))];
    let rules = vec![rule("follow_up_7d", AutomationTrigger::FollowUp, 7, Channel::Internal)];
    let mut state = EngineState::default();

    let fired = engine().evaluate(&mut state, &quotes, &rules, &clock(today));

    assert_eq!(fired[0].status, LogStatus::Sent);
    assert_eq!(state.ledger.pending_deliveries().count(), 0);
}

#[test]
fn test_day_gate_limits_to_one_pass() {
    let today = day(2024, 6, 12);
    let quotes = vec![sent_quote("2024-042", today - Days::new(7))];
    let rules = vec![rule("follow_up_7d", AutomationTrigger::FollowUp, 7, Channel::Email)];
    let mut state = EngineState::default();
    let engine = engine();

    assert_eq!(engine.evaluate(&mut state, &quotes, &rules, &clock(today)).len(), 1);
    for _ in 0..3 {
        assert!(engine.evaluate(&mut state, &quotes, &rules, &clock(today)).is_empty());
    }
    assert_eq!(state.ledger.len(), 1);
    assert_eq!(state.gate.last_run(), Some(today));
}

#[test]
fn test_gate_closes_when_nothing_fires() {
    let today = day(2024, 6, 12);
    let mut state = EngineState::default();

    let fired = engine().evaluate(&mut state, &[], &[], &clock(today));

    assert!(fired.is_empty());
    assert!(!state.gate.is_open(today));
    assert!(state.gate.is_open(today + Days::new(1)));
}

/// With the gate reopened, the ledger alone still prevents a second firing.
#[test]
fn test_dedup_key_prevents_refiring_same_day() {
    let today = day(2024, 1, 31);
    let mut quote = sent_quote("2024-043", day(2024, 1, 1));
    quote.status = QuoteStatus::Accepted;
    let quotes = vec![quote];
    let rules = vec![rule("overdue_30d", AutomationTrigger::PaymentOverdue, 30, Channel::Email)];
    let engine = engine();

    let mut state = EngineState::default();
    assert_eq!(engine.evaluate(&mut state, &quotes, &rules, &clock(today)).len(), 1);

    state.gate = DayGate::default();
    assert!(engine.evaluate(&mut state, &quotes, &rules, &clock(today)).is_empty());

    // Threshold trigger fires again on the next day under a new key
    let tomorrow = today + Days::new(1);
    assert_eq!(engine.evaluate(&mut state, &quotes, &rules, &clock(tomorrow)).len(), 1);
    assert_eq!(state.ledger.len(), 2);
}

#[test]
fn test_expiring_fires_only_at_exact_distance() {
    let rules = vec![rule("expiring_3d", AutomationTrigger::QuoteExpiring, 3, Channel::Email)];
    let quote = sent_quote("2024-044", day(2024, 6, 1));
    let expiry = quote.expiry_date.unwrap();
    let engine = engine();

    for (distance, expected) in [(4u64, 0usize), (3, 1), (2, 0)] {
        let mut state = EngineState::default();
        let today = expiry - Days::new(distance);
        let fired = engine.evaluate(&mut state, &[quote.clone()], &rules, &clock(today));
        assert_eq!(fired.len(), expected, "distance {}", distance);
    }
}

#[test]
fn test_expired_rule_fires_once_across_days() {
    let rules = vec![rule("expired_notice", AutomationTrigger::QuoteExpired, 0, Channel::Internal)];
    let quotes = vec![sent_quote("2024-045", day(2024, 6, 1))];
    let expiry = quotes[0].expiry_date.unwrap();
    let engine = engine();
    let mut state = EngineState::default();

    let mut total = 0;
    for offset in 0..5 {
        let today = expiry + Days::new(offset);
        total += engine.evaluate(&mut state, &quotes, &rules, &clock(today)).len();
    }

    assert_eq!(total, 1);
    assert_eq!(
        state.ledger.entries()[0].timestamp.date_naive(),
        expiry + Days::new(1)
    );
}

#[test]
fn test_disabled_rule_never_fires() {
    let today = day(2024, 6, 12);
    let quotes = vec![sent_quote("2024-046", today - Days::new(7))];
    let mut disabled = rule("follow_up_7d", AutomationTrigger::FollowUp, 7, Channel::Email);
    disabled.enabled = false;

    let mut state = EngineState::default();
    let fired = engine().evaluate(&mut state, &quotes, &[disabled], &clock(today));

    assert!(fired.is_empty());
    assert!(state.ledger.is_empty());
}

#[test]
fn test_weekly_report_fires_only_on_monday() {
    let rules = vec![rule("weekly_report", AutomationTrigger::WeeklyReport, 0, Channel::Internal)];
    let monday = day(2024, 6, 10);
    let quotes = vec![sent_quote("2024-047", monday - Days::new(3))];
    let engine = engine();

    let mut state = EngineState::default();
    let fired = engine.evaluate(&mut state, &quotes, &rules, &clock(monday));
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].id, "weekly_report_2024-06-10");
    assert_eq!(fired[0].quote_id, None);

    for offset in 1..7 {
        let mut state = EngineState::default();
        let other = monday + Days::new(offset);
        assert!(engine.evaluate(&mut state, &quotes, &rules, &clock(other)).is_empty());
    }
}

#[test]
fn test_event_rules_skipped_by_daily_pass() {
    let today = day(2024, 6, 12);
    let mut quote = sent_quote("2024-048", today - Days::new(7));
    quote.status = QuoteStatus::Accepted;
    let rules = vec![rule(
        "accepted_notice",
        AutomationTrigger::QuoteAccepted,
        0,
        Channel::Internal,
    )];

    let mut state = EngineState::default();
    assert!(engine().evaluate(&mut state, &[quote], &rules, &clock(today)).is_empty());
}

#[test]
fn test_on_event_fires_once_per_day() {
    let today = day(2024, 6, 12);
    let mut quote = sent_quote("2024-049", today - Days::new(2));
    quote.status = QuoteStatus::Accepted;
    quote.payment_status = Some(PaymentStatus::Unpaid);
    let rules = vec![
        rule("accepted_notice", AutomationTrigger::QuoteAccepted, 0, Channel::Internal),
        rule("payment_notice", AutomationTrigger::PaymentReceived, 0, Channel::Internal),
    ];
    let engine = engine();
    let mut ledger = ExecutionLog::default();

    let fired = engine.on_event(&mut ledger, QuoteEvent::Accepted, &quote, &rules, &clock(today));
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].rule_id, "accepted_notice");
    assert!(fired[0].action.contains("accettato"));

    assert!(engine
        .on_event(&mut ledger, QuoteEvent::Accepted, &quote, &rules, &clock(today))
        .is_empty());
    assert_eq!(ledger.len(), 1);
}

#[test]
fn test_template_is_rendered_into_message() {
    let today = day(2024, 6, 12);
    let mut quote = sent_quote("2024-050", today - Days::new(14));
    quote.client_company = Some("Bianchi Srl".to_string());
    let rules = vec![
        rule("follow_up_14d", AutomationTrigger::FollowUp, 14, Channel::Both).with_template(
            "Gentile {{client_name}}, preventivo {{quote_number}} ({{days}} giorni) - {{firma}}",
        ),
    ];

    let mut state = EngineState::default();
    let fired =
        RuleEngine::new("Rossi Impianti").evaluate(&mut state, &[quote], &rules, &clock(today));

    assert_eq!(
        fired[0].message.as_deref(),
        Some("Gentile Bianchi Srl, preventivo 2024-050 (14 giorni) - {{firma}}")
    );
    assert_eq!(fired[0].client_name.as_deref(), Some("Bianchi Srl"));
}

#[test]
fn test_pass_respects_ledger_cap() {
    let today = day(2024, 6, 12);
    let quotes: Vec<Quote> = (0..30)
        .map(|n| sent_quote(&format!("2024-{:03}", n), today - Days::new(7)))
        .collect();
    let rules = vec![rule("follow_up_7d", AutomationTrigger::FollowUp, 7, Channel::Email)];
    let mut state = EngineState::new(ExecutionLog::new(20), DayGate::default());

    let fired = engine().evaluate(&mut state, &quotes, &rules, &clock(today));

    assert_eq!(fired.len(), 30);
    assert_eq!(state.ledger.len(), 20);
    assert_eq!(state.ledger.entries()[19].id, fired[29].id);
}

#[test]
fn test_record_runs_updates_statistics() {
    let today = day(2024, 6, 12);
    let quotes = vec![
        sent_quote("2024-051", today - Days::new(7)),
        sent_quote("2024-052", today - Days::new(7)),
    ];
    let mut rules = vec![
        rule("follow_up_7d", AutomationTrigger::FollowUp, 7, Channel::Email),
        rule("follow_up_14d", AutomationTrigger::FollowUp, 14, Channel::Email),
    ];
    let clock = clock(today);
    let mut state = EngineState::default();

    let fired = engine().evaluate(&mut state, &quotes, &rules, &clock);
    let updated = record_runs(&mut rules, &fired, clock.timestamp);

    assert_eq!(updated, 1);
    assert_eq!(rules[0].run_count, 2);
    assert_eq!(rules[0].last_run, Some(clock.timestamp));
    assert_eq!(rules[1].run_count, 0);
    assert_eq!(rules[1].last_run, None);
}
