use crate::services::automation_engine::AutomationEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Start a scheduler that runs one automation pass every `interval`.
/// The returned scheduler must be kept alive for the job to keep firing.
pub async fn start_automation(
    engine: Arc<AutomationEngine>,
    interval: Duration,
) -> Result<JobScheduler, JobSchedulerError> {
    let sched = JobScheduler::new().await?;

    let job = Job::new_repeated_async(interval, move |_uuid, _l| {
        let engine = engine.clone();
        Box::pin(async move {
            let results = engine.run().await;
            if !results.is_empty() {
                let failed = results.iter().filter(|r| !r.success).count();
                log::info!(
                    "Automation pass executed {} rules ({} failed)",
                    results.len(),
                    failed
                );
            }
        })
    })?;
    sched.add(job).await?;
    sched.start().await?;

    log::info!("Automation scheduler running every {:?}", interval);
    Ok(sched)
}
