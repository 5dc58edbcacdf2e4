use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{error, info};

use crate::automation::EvaluationClock;
use crate::worker::executor::{AutomationExecutor, PassReport};

/// Wakes up periodically and attempts the daily automation pass.
///
/// Polling more often than once a day is harmless: the day-gate turns every
/// attempt after the first of the day into a no-op.
pub struct JobScheduler {
    executor: Arc<AutomationExecutor>,

    /// Polling interval in seconds
    poll_interval_seconds: u64,

    /// Whether the scheduler is running (wrapped in Arc for sharing)
    running: Arc<RwLock<bool>>,
}

impl JobScheduler {
    /// Creates a new job scheduler.
    ///
    /// # Arguments
    ///
    /// * `executor` - Executor running the daily pass
    /// * `poll_interval_seconds` - How often to attempt the pass (default: 3600)
    ///
    /// # Returns
    ///
    /// Returns a new `JobScheduler` instance.
    pub fn new(executor: Arc<AutomationExecutor>, poll_interval_seconds: Option<u64>) -> Self {
        Self {
            executor,
            poll_interval_seconds: poll_interval_seconds.unwrap_or(3600),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Starts the scheduler loop.
    ///
    /// Runs until [`JobScheduler::stop`] is called. Errors from a pass are
    /// logged and the loop keeps going.
    ///
    /// # Errors
    ///
    /// Pass failures are logged rather than returned, so the loop itself
    /// does not fail.
    pub async fn start(&self) -> Result<(), anyhow::Error> {
        *self.running.write().await = true;
        info!(
            "JobScheduler started with poll interval: {} seconds",
            self.poll_interval_seconds
        );

        while *self.running.read().await {
            match self.tick().await {
                Ok(report) if !report.skipped => {
                    info!(
                        "Automation pass fired {} action(s), expired {} quote(s)",
                        report.fired.len(),
                        report.expired.len()
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Error in scheduler loop: {}", e);
                }
            }

            sleep(Duration::from_secs(self.poll_interval_seconds)).await;
        }

        info!("JobScheduler stopped");
        Ok(())
    }

    /// Sets the running flag to false; the loop exits after its current sleep.
    pub async fn stop(&self) {
        info!("Stopping JobScheduler...");
        *self.running.write().await = false;
    }

    /// Attempts one pass for the current local day.
    pub async fn tick(&self) -> Result<PassReport, anyhow::Error> {
        self.executor.run_daily(EvaluationClock::now()).await
    }
}
