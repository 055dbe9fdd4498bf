use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AudioJob, JobId, StoragePath};

use super::RepositoryError;

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &AudioJob) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<AudioJob>, RepositoryError>;

    /// Pending -> Processing, stamping `started_at`.
    async fn mark_processing(&self, id: JobId) -> Result<(), RepositoryError>;

    async fn set_progress(&self, id: JobId, progress: f64) -> Result<(), RepositoryError>;

    /// Processing -> Completed, recording the output object and stamping
    /// `completed_at`.
    async fn mark_completed(
        &self,
        id: JobId,
        output_path: &StoragePath,
    ) -> Result<(), RepositoryError>;

    async fn mark_failed(&self, id: JobId, error_message: &str) -> Result<(), RepositoryError>;

    /// Jobs whose expiry deadline passed and are not yet expired.
    async fn list_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<AudioJob>, RepositoryError>;

    async fn mark_expired(&self, id: JobId) -> Result<(), RepositoryError>;
}
