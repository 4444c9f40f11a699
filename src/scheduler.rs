//! Periodic trigger for the billing accrual job
//!
//! The job itself only exposes `run_daily_accrual`; when and how often it runs
//! is decided here.

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::services::accrual::AccrualJob;

/// Spawn a task calling the accrual job every `period`.
///
/// The first run happens one full period after startup.
pub fn spawn_accrual(job: AccrualJob, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() completes its first tick immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match job.run_daily_accrual().await {
                Ok(summary) => tracing::info!(?summary, "Accrual run completed"),
                Err(e) => tracing::error!(error = %e, "Accrual run aborted"),
            }
        }
    })
}
