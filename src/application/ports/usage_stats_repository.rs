use async_trait::async_trait;

use crate::domain::{UsageStats, UserId};

use super::RepositoryError;

#[async_trait]
pub trait UsageStatsRepository: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<UsageStats>, RepositoryError>;

    async fn record_upload(
        &self,
        user_id: UserId,
        input_bytes: i64,
        processing_type: &str,
    ) -> Result<(), RepositoryError>;

    async fn record_processed(
        &self,
        user_id: UserId,
        output_bytes: i64,
        processing_secs: f64,
    ) -> Result<(), RepositoryError>;

    async fn record_failure(&self, user_id: UserId) -> Result<(), RepositoryError>;

    async fn record_download(&self, user_id: UserId) -> Result<(), RepositoryError>;
}
