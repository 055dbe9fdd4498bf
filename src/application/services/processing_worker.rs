use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tracing::Instrument;

use crate::application::ports::{
    AudioProcessor, AudioProcessorError, JobRepository, MediaStore, MediaStoreError,
    RepositoryError,
};
use crate::application::services::{UsageTracker, WorkerMonitor, AUDIO_PROCESSING_QUEUE};
use crate::domain::{AudioJob, JobId, JobStatus, StoragePath};

/// How long an idle worker waits on the queue before emitting a heartbeat.
const IDLE_POLL: Duration = Duration::from_secs(5);

pub struct ProcessingMessage {
    pub job_id: JobId,
}

/// Consumes the `audio_processing` queue. Multiple workers share one
/// receiver; whichever acquires the lock first takes the next message.
pub struct ProcessingWorker {
    name: String,
    receiver: Arc<Mutex<mpsc::Receiver<ProcessingMessage>>>,
    jobs: Arc<dyn JobRepository>,
    media_store: Arc<dyn MediaStore>,
    processor: Arc<dyn AudioProcessor>,
    usage: Arc<UsageTracker>,
    monitor: Arc<WorkerMonitor>,
}

impl ProcessingWorker {
    pub fn new(
        name: impl Into<String>,
        receiver: Arc<Mutex<mpsc::Receiver<ProcessingMessage>>>,
        jobs: Arc<dyn JobRepository>,
        media_store: Arc<dyn MediaStore>,
        processor: Arc<dyn AudioProcessor>,
        usage: Arc<UsageTracker>,
        monitor: Arc<WorkerMonitor>,
    ) -> Self {
        Self {
            name: name.into(),
            receiver,
            jobs,
            media_store,
            processor,
            usage,
            monitor,
        }
    }

    pub async fn run(self) {
        self.monitor
            .register_worker(self.name.clone(), AUDIO_PROCESSING_QUEUE)
            .await;
        tracing::info!(worker = %self.name, "Processing worker started");

        loop {
            self.monitor.heartbeat(&self.name).await;

            let msg = {
                let mut rx = match tokio::time::timeout(IDLE_POLL, self.receiver.lock()).await {
                    Ok(guard) => guard,
                    Err(_) => continue,
                };
                match tokio::time::timeout(IDLE_POLL, rx.recv()).await {
                    Ok(Some(msg)) => msg,
                    Ok(None) => break,
                    Err(_) => continue,
                }
            };

            let span = tracing::info_span!(
                "processing_job",
                worker = %self.name,
                job_id = %msg.job_id.as_uuid(),
            );
            if let Err(e) = self.process_job(msg.job_id).instrument(span).await {
                tracing::error!(error = %e, job_id = %msg.job_id.as_uuid(), "Audio processing job failed");
            }
        }

        self.monitor.deregister_worker(&self.name).await;
        tracing::info!(worker = %self.name, "Processing worker stopped: channel closed");
    }

    async fn process_job(&self, job_id: JobId) -> Result<(), ProcessingWorkerError> {
        let job = self
            .jobs
            .get_by_id(job_id)
            .await
            .map_err(ProcessingWorkerError::Repository)?
            .ok_or(ProcessingWorkerError::JobNotFound(job_id))?;

        if job.status != JobStatus::Pending {
            tracing::warn!(status = %job.status, "Skipping job not in pending state");
            return Ok(());
        }

        self.jobs
            .mark_processing(job_id)
            .await
            .map_err(ProcessingWorkerError::Repository)?;
        self.monitor.heartbeat(&self.name).await;

        let started = Instant::now();
        let result = self.process_pipeline(&job).await;

        match result {
            Ok((output_path, output_bytes)) => {
                self.jobs
                    .mark_completed(job_id, &output_path)
                    .await
                    .map_err(ProcessingWorkerError::Repository)?;
                self.usage
                    .record_processed(&job.owner, output_bytes as i64, started.elapsed().as_secs_f64())
                    .await;
                tracing::info!(
                    output = %output_path,
                    bytes = output_bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Audio processing completed"
                );
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                self.jobs
                    .mark_failed(job_id, &error_msg)
                    .await
                    .map_err(ProcessingWorkerError::Repository)?;
                self.usage.record_failure(&job.owner).await;
                Err(e)
            }
        }
    }

    async fn process_pipeline(
        &self,
        job: &AudioJob,
    ) -> Result<(StoragePath, u64), ProcessingWorkerError> {
        let data = self
            .media_store
            .fetch(&job.input_path)
            .await
            .map_err(ProcessingWorkerError::Store)?;

        self.jobs
            .set_progress(job.id, 0.25)
            .await
            .map_err(ProcessingWorkerError::Repository)?;

        let processed = self
            .processor
            .process(&data, job.format)
            .await
            .map_err(ProcessingWorkerError::Processing)?;

        self.jobs
            .set_progress(job.id, 0.75)
            .await
            .map_err(ProcessingWorkerError::Repository)?;

        let output_path = StoragePath::output(&job.id);
        let output_bytes = processed.data.len() as u64;
        let stream =
            futures::stream::once(async move { Ok::<_, std::io::Error>(Bytes::from(processed.data)) })
                .boxed();
        self.media_store
            .store(&output_path, stream)
            .await
            .map_err(ProcessingWorkerError::Store)?;

        Ok((output_path, output_bytes))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingWorkerError {
    #[error("job not found: {}", .0.as_uuid())]
    JobNotFound(JobId),
    #[error("repository: {0}")]
    Repository(RepositoryError),
    #[error("media store: {0}")]
    Store(MediaStoreError),
    #[error("processing: {0}")]
    Processing(AudioProcessorError),
}
