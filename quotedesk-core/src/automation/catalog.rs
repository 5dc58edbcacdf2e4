use crate::models::{AutomationRule, AutomationTrigger, Channel, TargetAudience};

fn rule(
    id: &str,
    name: &str,
    trigger: AutomationTrigger,
    delay_days: i32,
    channel: Channel,
    target_audience: TargetAudience,
    template: &str,
) -> AutomationRule {
    AutomationRule {
        id: id.to_string(),
        name: name.to_string(),
        trigger,
        enabled: true,
        delay_days,
        channel,
        target_audience,
        email_template: Some(template.to_string()),
        run_count: 0,
        last_run: None,
    }
}

/// Built-in rules used until the user saves a configuration of their own.
pub fn default_catalog() -> Vec<AutomationRule> {
    use AutomationTrigger::*;

    vec![
        rule(
            "expiring_3d",
            "Promemoria scadenza (3 giorni)",
            QuoteExpiring,
            3,
            Channel::Email,
            TargetAudience::Client,
            "Gentile {{client_name}}, le ricordiamo che il preventivo {{quote_number}} \
             di {{quote_total}} scade il {{expiry_date}}.\n\nCordiali saluti,\n{{company_name}}",
        ),
        rule(
            "expiring_1d",
            "Promemoria scadenza (1 giorno)",
            QuoteExpiring,
            1,
            Channel::Both,
            TargetAudience::Client,
            "Gentile {{client_name}}, il preventivo {{quote_number}} scade domani \
             ({{expiry_date}}).\n\nCordiali saluti,\n{{company_name}}",
        ),
        rule(
            "expired_notice",
            "Preventivo scaduto",
            QuoteExpired,
            0,
            Channel::Internal,
            TargetAudience::Owner,
            "Il preventivo {{quote_number}} per {{client_name}} è scaduto il {{expiry_date}}.",
        ),
        rule(
            "follow_up_7d",
            "Follow-up (7 giorni)",
            FollowUp,
            7,
            Channel::Email,
            TargetAudience::Client,
            "Gentile {{client_name}}, ha avuto modo di valutare il preventivo \
             {{quote_number}}? Restiamo a disposizione per qualsiasi \
             chiarimento.\n\n{{company_name}}",
        ),
        rule(
            "follow_up_14d",
            "Follow-up (14 giorni)",
            FollowUp,
            14,
            Channel::Both,
            TargetAudience::Client,
            "Gentile {{client_name}}, la ricontattiamo riguardo al preventivo \
             {{quote_number}} inviato {{days}} giorni fa.\n\n{{company_name}}",
        ),
        rule(
            "payment_overdue_30d",
            "Sollecito pagamento (30 giorni)",
            PaymentOverdue,
            30,
            Channel::Email,
            TargetAudience::Client,
            "Gentile {{client_name}}, risulta ancora da saldare l'importo di \
             {{quote_total}} relativo al preventivo {{quote_number}}.\n\n{{company_name}}",
        ),
        rule(
            "accepted_notice",
            "Notifica accettazione",
            QuoteAccepted,
            0,
            Channel::Internal,
            TargetAudience::Owner,
            "{{client_name}} ha accettato il preventivo {{quote_number}} ({{quote_total}}).",
        ),
        rule(
            "payment_received_notice",
            "Notifica pagamento ricevuto",
            PaymentReceived,
            0,
            Channel::Internal,
            TargetAudience::Owner,
            "Pagamento ricevuto da {{client_name}} per il preventivo {{quote_number}}.",
        ),
        rule(
            "weekly_report",
            "Report settimanale",
            WeeklyReport,
            0,
            Channel::Internal,
            TargetAudience::Team,
            "Report settimanale di {{company_name}}",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_catalog_ids_are_unique() {
        let rules = default_catalog();
        let ids: HashSet<_> = rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), rules.len());
    }

    #[test]
    fn test_default_catalog_covers_every_trigger() {
        let triggers: HashSet<_> = default_catalog().iter().map(|r| r.trigger).collect();
        assert_eq!(triggers.len(), 7);
        assert!(default_catalog().iter().all(|r| r.enabled));
    }
}
