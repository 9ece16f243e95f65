use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, info};

use lib_livewatch::core::Scheduler;

/// Starts a cron job that requests a poll cycle on every tick.
///
/// `cron` uses the six-field form with seconds, e.g. `0 * * * * *` for the
/// top of every minute. The returned handle must be kept to stop the job.
pub async fn start_timer(cron: &str, scheduler: Scheduler) -> Result<JobScheduler, JobSchedulerError> {
    let jobs = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let scheduler = scheduler.clone();
        Box::pin(async move {
            let outcome = scheduler.trigger();
            debug!(?outcome, "timer tick");
        })
    })?;

    jobs.add(job).await?;
    jobs.start().await?;
    info!("Refresh timer started with schedule '{}'", cron);
    Ok(jobs)
}
