use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AutomationLog, AutomationRule, PaymentStatus, Quote, QuoteItem, QuoteStatus};
use crate::store::{LogStore, QuoteStore, RuleStore, RunMarkerStore};

const DAILY_PASS_MARKER: &str = "daily_pass";
const RULES_CONFIGURED_MARKER: &str = "rules_configured";

/// Row shape of the `quotes` table.
///
/// Legacy rows may have NULL `status`/`payment_status`; they decode as
/// `draft` and no payment status.
#[derive(Debug, FromRow)]
struct QuoteRow {
    id: Uuid,
    number: String,
    client_name: String,
    client_company: Option<String>,
    client_email: Option<String>,
    status: Option<QuoteStatus>,
    payment_status: Option<PaymentStatus>,
    paid_amount: Option<Decimal>,
    paid_date: Option<NaiveDate>,
    issue_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
    items: Json<Vec<QuoteItem>>,
}

impl From<QuoteRow> for Quote {
    fn from(row: QuoteRow) -> Self {
        Quote {
            id: row.id,
            number: row.number,
            client_name: row.client_name,
            client_company: row.client_company,
            client_email: row.client_email,
            status: row.status.unwrap_or_default(),
            payment_status: row.payment_status,
            paid_amount: row.paid_amount,
            paid_date: row.paid_date,
            date: row.issue_date,
            expiry_date: row.expiry_date,
            items: row.items.0,
        }
    }
}

/// PostgreSQL implementation of every store seam.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    async fn marker_exists(&self, name: &str) -> Result<bool, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM automation_markers WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl QuoteStore for PgStore {
    #[instrument(skip(self))]
    async fn load_all(&self) -> Result<Vec<Quote>, StoreError> {
        let rows = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT
                id, number, client_name, client_company, client_email,
                status, payment_status, paid_amount, paid_date,
                issue_date, expiry_date, items
            FROM quotes
            ORDER BY issue_date ASC, number ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Quote::from).collect())
    }

    async fn upsert(&self, quote: &Quote) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO quotes (
                id, number, client_name, client_company, client_email,
                status, payment_status, paid_amount, paid_date,
                issue_date, expiry_date, items, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
            ON CONFLICT (id) DO UPDATE SET
                number = EXCLUDED.number,
                client_name = EXCLUDED.client_name,
                client_company = EXCLUDED.client_company,
                client_email = EXCLUDED.client_email,
                status = EXCLUDED.status,
                payment_status = EXCLUDED.payment_status,
                paid_amount = EXCLUDED.paid_amount,
                paid_date = EXCLUDED.paid_date,
                issue_date = EXCLUDED.issue_date,
                expiry_date = EXCLUDED.expiry_date,
                items = EXCLUDED.items,
                updated_at = NOW()
            "#,
        )
        .bind(quote.id)
        .bind(&quote.number)
        .bind(&quote.client_name)
        .bind(&quote.client_company)
        .bind(&quote.client_email)
        .bind(quote.status)
        .bind(quote.payment_status)
        .bind(quote.paid_amount)
        .bind(quote.paid_date)
        .bind(quote.date)
        .bind(quote.expiry_date)
        .bind(Json(&quote.items))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM quotes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RuleStore for PgStore {
    async fn load_rules(&self) -> Result<Option<Vec<AutomationRule>>, StoreError> {
        if !self.marker_exists(RULES_CONFIGURED_MARKER).await? {
            return Ok(None);
        }

        let rules = sqlx::query_as::<_, AutomationRule>(
            r#"
            SELECT
                id, name, trigger_kind, enabled, delay_days, channel,
                target_audience, email_template, run_count, last_run
            FROM automation_rules
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(rules))
    }

    async fn save_rules(&self, rules: &[AutomationRule]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM automation_rules")
            .execute(&mut *tx)
            .await?;

        for (position, rule) in rules.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO automation_rules (
                    id, position, name, trigger_kind, enabled, delay_days, channel,
                    target_audience, email_template, run_count, last_run
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(&rule.id)
            .bind(position as i32)
            .bind(&rule.name)
            .bind(rule.trigger)
            .bind(rule.enabled)
            .bind(rule.delay_days)
            .bind(rule.channel)
            .bind(rule.target_audience)
            .bind(&rule.email_template)
            .bind(rule.run_count)
            .bind(rule.last_run)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO automation_markers (name, day, updated_at)
            VALUES ($1, NULL, NOW())
            ON CONFLICT (name) DO UPDATE SET updated_at = NOW()
            "#,
        )
        .bind(RULES_CONFIGURED_MARKER)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl LogStore for PgStore {
    async fn load_log(&self) -> Result<Vec<AutomationLog>, StoreError> {
        let entries = sqlx::query_as::<_, AutomationLog>(
            r#"
            SELECT
                id, rule_id, rule_name, quote_id, quote_number, client_name,
                action, message, status, channel, fired_at
            FROM automation_logs
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn save_log(&self, entries: &[AutomationLog]) -> Result<(), StoreError> {
        let keep: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM automation_logs WHERE id <> ALL($1)")
            .bind(&keep)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO automation_logs (
                    id, rule_id, rule_name, quote_id, quote_number, client_name,
                    action, message, status, channel, fired_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&entry.id)
            .bind(&entry.rule_id)
            .bind(&entry.rule_name)
            .bind(entry.quote_id)
            .bind(&entry.quote_number)
            .bind(&entry.client_name)
            .bind(&entry.action)
            .bind(&entry.message)
            .bind(entry.status)
            .bind(entry.channel)
            .bind(entry.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RunMarkerStore for PgStore {
    async fn get_last_run_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        let row: Option<(Option<NaiveDate>,)> =
            sqlx::query_as("SELECT day FROM automation_markers WHERE name = $1")
                .bind(DAILY_PASS_MARKER)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(day,)| day))
    }

    async fn set_last_run_date(&self, date: NaiveDate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO automation_markers (name, day, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (name) DO UPDATE SET day = EXCLUDED.day, updated_at = NOW()
            "#,
        )
        .bind(DAILY_PASS_MARKER)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
