use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{RepositoryError, UsageStatsRepository};
use crate::domain::{UsageStats, UserId};

use super::map_sqlx_error;

pub struct PgUsageStatsRepository {
    pool: PgPool,
}

impl PgUsageStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStatsRepository for PgUsageStatsRepository {
    #[instrument(skip(self), fields(user_id = %user_id.as_uuid()))]
    async fn get(&self, user_id: UserId) -> Result<Option<UsageStats>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, total_files_uploaded, total_files_processed, total_files_failed,
                   total_files_downloaded, total_input_bytes, total_output_bytes,
                   total_processing_secs, processing_types_count,
                   first_upload_at, last_upload_at, last_download_at, updated_at
            FROM user_usage_stats
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let get = |e: sqlx::Error| RepositoryError::QueryFailed(e.to_string());
        let Json(processing_types_count): Json<HashMap<String, i64>> =
            row.try_get("processing_types_count").map_err(get)?;

        Ok(Some(UsageStats {
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id").map_err(get)?),
            total_files_uploaded: row.try_get("total_files_uploaded").map_err(get)?,
            total_files_processed: row.try_get("total_files_processed").map_err(get)?,
            total_files_failed: row.try_get("total_files_failed").map_err(get)?,
            total_files_downloaded: row.try_get("total_files_downloaded").map_err(get)?,
            total_input_bytes: row.try_get("total_input_bytes").map_err(get)?,
            total_output_bytes: row.try_get("total_output_bytes").map_err(get)?,
            total_processing_secs: row.try_get("total_processing_secs").map_err(get)?,
            processing_types_count,
            first_upload_at: row.try_get("first_upload_at").map_err(get)?,
            last_upload_at: row.try_get("last_upload_at").map_err(get)?,
            last_download_at: row.try_get("last_download_at").map_err(get)?,
            updated_at: row.try_get("updated_at").map_err(get)?,
        }))
    }

    #[instrument(skip(self), fields(user_id = %user_id.as_uuid()))]
    async fn record_upload(
        &self,
        user_id: UserId,
        input_bytes: i64,
        processing_type: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO user_usage_stats (
                user_id, total_files_uploaded, total_input_bytes, processing_types_count,
                first_upload_at, last_upload_at, updated_at
            )
            VALUES ($1, 1, $2, jsonb_build_object($3::text, 1), $4, $4, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                total_files_uploaded = user_usage_stats.total_files_uploaded + 1,
                total_input_bytes = user_usage_stats.total_input_bytes + EXCLUDED.total_input_bytes,
                processing_types_count = jsonb_set(
                    user_usage_stats.processing_types_count,
                    ARRAY[$3::text],
                    to_jsonb(COALESCE((user_usage_stats.processing_types_count ->> $3::text)::bigint, 0) + 1)
                ),
                first_upload_at = COALESCE(user_usage_stats.first_upload_at, EXCLUDED.first_upload_at),
                last_upload_at = EXCLUDED.last_upload_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(input_bytes)
        .bind(processing_type)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id.as_uuid()))]
    async fn record_processed(
        &self,
        user_id: UserId,
        output_bytes: i64,
        processing_secs: f64,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO user_usage_stats (
                user_id, total_files_processed, total_output_bytes,
                total_processing_secs, updated_at
            )
            VALUES ($1, 1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                total_files_processed = user_usage_stats.total_files_processed + 1,
                total_output_bytes = user_usage_stats.total_output_bytes + EXCLUDED.total_output_bytes,
                total_processing_secs = user_usage_stats.total_processing_secs + EXCLUDED.total_processing_secs,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(output_bytes)
        .bind(processing_secs)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id.as_uuid()))]
    async fn record_failure(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO user_usage_stats (user_id, total_files_failed, updated_at)
            VALUES ($1, 1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                total_files_failed = user_usage_stats.total_files_failed + 1,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id.as_uuid()))]
    async fn record_download(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO user_usage_stats (user_id, total_files_downloaded, last_download_at, updated_at)
            VALUES ($1, 1, $2, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                total_files_downloaded = user_usage_stats.total_files_downloaded + 1,
                last_download_at = EXCLUDED.last_download_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
