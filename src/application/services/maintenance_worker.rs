use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use crate::application::ports::{JobRepository, MediaStore, RepositoryError, TokenBlacklist};
use crate::application::services::{WorkerMonitor, MAINTENANCE_QUEUE};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const EXPIRY_BATCH_SIZE: usize = 100;

/// Interval-driven housekeeping: removes stored objects of jobs past their
/// expiry deadline, marks those jobs expired, and purges blacklist entries
/// whose tokens have themselves expired.
pub struct MaintenanceWorker {
    name: String,
    sweep_interval: Duration,
    jobs: Arc<dyn JobRepository>,
    media_store: Arc<dyn MediaStore>,
    token_blacklist: Arc<dyn TokenBlacklist>,
    monitor: Arc<WorkerMonitor>,
}

impl MaintenanceWorker {
    pub fn new(
        name: impl Into<String>,
        sweep_interval: Duration,
        jobs: Arc<dyn JobRepository>,
        media_store: Arc<dyn MediaStore>,
        token_blacklist: Arc<dyn TokenBlacklist>,
        monitor: Arc<WorkerMonitor>,
    ) -> Self {
        Self {
            name: name.into(),
            sweep_interval,
            jobs,
            media_store,
            token_blacklist,
            monitor,
        }
    }

    pub async fn run(self) {
        self.monitor
            .register_worker(self.name.clone(), MAINTENANCE_QUEUE)
            .await;
        tracing::info!(worker = %self.name, "Maintenance worker started");

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    self.monitor.heartbeat(&self.name).await;
                }
                _ = sweep.tick() => {
                    self.monitor.heartbeat(&self.name).await;
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Maintenance sweep failed");
                    }
                }
            }
        }
    }

    pub async fn sweep(&self) -> Result<(), RepositoryError> {
        let now = Utc::now();

        let expired = self.jobs.list_expired(now, EXPIRY_BATCH_SIZE).await?;
        for job in &expired {
            if let Err(e) = self.media_store.delete(&job.input_path).await {
                tracing::warn!(error = %e, path = %job.input_path, "Failed to delete expired input object");
            }
            if let Some(output_path) = &job.output_path {
                if let Err(e) = self.media_store.delete(output_path).await {
                    tracing::warn!(error = %e, path = %output_path, "Failed to delete expired output object");
                }
            }
            self.jobs.mark_expired(job.id).await?;
        }

        let purged = self.token_blacklist.purge_expired(now).await?;

        if !expired.is_empty() || purged > 0 {
            tracing::info!(
                expired_jobs = expired.len(),
                purged_tokens = purged,
                "Maintenance sweep finished"
            );
        }

        Ok(())
    }
}
