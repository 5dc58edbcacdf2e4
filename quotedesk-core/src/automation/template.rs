use std::collections::HashMap;

use crate::models::Quote;

/// Substitutes every `{{key}}` token in `template` with `vars[key]`.
///
/// Matching is exact and case-sensitive. Tokens with no entry in `vars` stay
/// in the output as written.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    if template.is_empty() {
        return String::new();
    }

    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let (before, tail) = rest.split_at(start);
        output.push_str(before);

        let Some(end) = tail[2..].find("}}") else {
            output.push_str(tail);
            return output;
        };
        let key = &tail[2..2 + end];

        match vars.get(key) {
            Some(value) => {
                output.push_str(value);
                rest = &tail[end + 4..];
            }
            None => {
                // Advance one brace so a token starting inside this one is still tried
                output.push('{');
                rest = &tail[1..];
            }
        }
    }

    output.push_str(rest);
    output
}

/// Variables available to rule templates for a quote.
pub fn quote_vars(quote: &Quote, company_name: &str, days: Option<i64>) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("company_name".to_string(), company_name.to_string());
    vars.insert("client_name".to_string(), quote.display_client().to_string());
    vars.insert("quote_number".to_string(), quote.number.clone());
    vars.insert("quote_total".to_string(), format_amount(quote.total()));
    vars.insert("quote_date".to_string(), format_date(quote.date));
    if let Some(expiry) = quote.expiry_date {
        vars.insert("expiry_date".to_string(), format_date(expiry));
    }
    if let Some(days) = days {
        vars.insert("days".to_string(), days.to_string());
    }
    vars
}

/// Formats an amount as shown in notifications, e.g. `€ 1234.50`.
pub fn format_amount(amount: rust_decimal::Decimal) -> String {
    format!("€ {:.2}", amount)
}

/// Formats a date the way the app displays it (dd/mm/yyyy).
pub fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_value() {
        assert_eq!(render("Hello {{name}}", &vars(&[("name", "Mario")])), "Hello Mario");
    }

    #[test]
    fn test_render_keeps_unknown_placeholder() {
        assert_eq!(render("Hi {{x}}", &HashMap::new()), "Hi {{x}}");
    }

    #[test]
    fn test_render_replaces_all_occurrences() {
        let out = render("{{a}}-{{a}}-{{b}}", &vars(&[("a", "1"), ("b", "2")]));
        assert_eq!(out, "1-1-2");
    }

    #[test]
    fn test_render_is_case_sensitive() {
        assert_eq!(render("{{Name}}", &vars(&[("name", "Mario")])), "{{Name}}");
    }

    #[test]
    fn test_render_empty_template() {
        assert_eq!(render("", &vars(&[("name", "Mario")])), "");
    }

    #[test]
    fn test_render_unterminated_token() {
        assert_eq!(render("Ciao {{name", &vars(&[("name", "Mario")])), "Ciao {{name");
    }

    #[test]
    fn test_render_does_not_expand_values() {
        let out = render("{{a}}", &vars(&[("a", "{{b}}"), ("b", "x")]));
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn test_render_token_after_extra_brace() {
        let vars = vars(&[("a", "1"), ("name", "Mario")]);
        assert_eq!(render("{{{a}}}", &vars), "{1}");
        assert_eq!(render("Totale {{ {{name}}", &vars), "Totale {{ Mario");
        assert_eq!(render("{{{x}}", &vars), "{{{x}}");
    }
}
