use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::error::{Result, SyncError};
use crate::notification::NotificationSync;

/// Start a scheduler that re-fetches notifications on `schedule` (six-field
/// cron, seconds first). The returned scheduler must be kept alive; call
/// `shutdown` on it when the bell unmounts.
pub async fn start_resync(sync: NotificationSync, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| SyncError::Config(format!("Cannot create resync scheduler: {}", e)))?;

    let job = Job::new_async(schedule, move |_uuid, _l| {
        let sync = sync.clone();

        Box::pin(async move {
            if !sync.is_mounted() {
                return;
            }
            if let Err(e) = sync.fetch_all().await {
                error!("Scheduled resync failed: {}", e);
            }
        })
    })
    .map_err(|e| SyncError::Config(format!("Invalid RESYNC_SCHEDULE '{}': {}", schedule, e)))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| SyncError::Config(format!("Cannot schedule resync: {}", e)))?;
    scheduler
        .start()
        .await
        .map_err(|e| SyncError::Config(format!("Cannot start resync scheduler: {}", e)))?;

    info!("Resync scheduled: {}", schedule);
    Ok(scheduler)
}
