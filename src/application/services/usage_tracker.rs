use std::sync::Arc;

use crate::application::ports::{RepositoryError, UsageStatsRepository};
use crate::domain::{JobOwner, UsageStats, UserId};

/// Fire-and-forget usage accounting. Tracking failures are logged and
/// swallowed: a statistics write must never fail an upload, a download, or a
/// processing job. Guest activity is not tracked; statistics are per account.
pub struct UsageTracker {
    repository: Arc<dyn UsageStatsRepository>,
}

impl UsageTracker {
    pub fn new(repository: Arc<dyn UsageStatsRepository>) -> Self {
        Self { repository }
    }

    pub async fn record_upload(&self, owner: &JobOwner, input_bytes: i64, processing_type: &str) {
        let Some(user_id) = owner.user_id() else {
            return;
        };
        if let Err(e) = self
            .repository
            .record_upload(user_id, input_bytes, processing_type)
            .await
        {
            tracing::warn!(error = %e, user_id = %user_id.as_uuid(), "Failed to record upload usage");
        }
    }

    pub async fn record_processed(&self, owner: &JobOwner, output_bytes: i64, processing_secs: f64) {
        let Some(user_id) = owner.user_id() else {
            return;
        };
        if let Err(e) = self
            .repository
            .record_processed(user_id, output_bytes, processing_secs)
            .await
        {
            tracing::warn!(error = %e, user_id = %user_id.as_uuid(), "Failed to record processing usage");
        }
    }

    pub async fn record_failure(&self, owner: &JobOwner) {
        let Some(user_id) = owner.user_id() else {
            return;
        };
        if let Err(e) = self.repository.record_failure(user_id).await {
            tracing::warn!(error = %e, user_id = %user_id.as_uuid(), "Failed to record failed-job usage");
        }
    }

    pub async fn record_download(&self, owner: &JobOwner) {
        let Some(user_id) = owner.user_id() else {
            return;
        };
        if let Err(e) = self.repository.record_download(user_id).await {
            tracing::warn!(error = %e, user_id = %user_id.as_uuid(), "Failed to record download usage");
        }
    }

    pub async fn stats_for(&self, user_id: UserId) -> Result<Option<UsageStats>, RepositoryError> {
        self.repository.get(user_id).await
    }
}
