use dotenv::dotenv;
use quotedesk_core::automation::RuleEngine;
use quotedesk_core::config::WorkerConfig;
use quotedesk_core::db::create_pool;
use quotedesk_core::state_machine::QuoteStateMachine;
use quotedesk_core::store::{MemoryStore, PgStore};
use quotedesk_core::worker::{AutomationExecutor, JobScheduler, Stores};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Worker binary entry point for the quote automation engine.
///
/// This binary runs as a background worker that:
/// - Attempts the daily automation pass at every poll
/// - Records fired actions in the execution log
/// - Expires lapsed quotes
///
/// State lives in the database, so restarts within a day do not re-fire rules.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(LevelFilter::INFO.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting QuoteDesk automation worker...");

    let config = WorkerConfig::from_env()?;

    let stores = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url, config.max_connections).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            Stores::shared(store)
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Stores::shared(MemoryStore::new())
        }
    };

    let executor = AutomationExecutor::new(
        stores,
        RuleEngine::new(config.company_name.clone()),
        QuoteStateMachine::new(config.transition_policy),
        config.log_cap,
    )
    .with_expiry_days(config.quote_expiry_days);

    let scheduler = Arc::new(JobScheduler::new(
        Arc::new(executor),
        Some(config.poll_interval_seconds),
    ));

    let runner = scheduler.clone();
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = runner.start().await {
            tracing::error!("Scheduler error: {}", e);
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            scheduler.stop().await;
        }
        _ = scheduler_handle => {
            info!("Scheduler task completed");
        }
    }

    info!("QuoteDesk automation worker stopped");
    Ok(())
}
