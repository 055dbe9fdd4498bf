use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{
    AudioFormat, AudioJob, AudioProperties, GuestId, JobId, JobOwner, JobStatus, StoragePath,
    UserId,
};

use super::map_sqlx_error;

const JOB_COLUMNS: &str = "id, filename, original_filename, file_size, format, sample_rate, \
     channels, duration_secs, processing_type, input_path, output_path, user_id, guest_id, \
     status, progress, error_message, created_at, started_at, completed_at, expires_at";

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn job_from_row(row: &PgRow) -> Result<AudioJob, RepositoryError> {
    let get = |e: sqlx::Error| RepositoryError::QueryFailed(e.to_string());

    let format_str: String = row.try_get("format").map_err(get)?;
    let format = AudioFormat::from_extension(&format_str)
        .ok_or_else(|| RepositoryError::QueryFailed(format!("invalid format: {}", format_str)))?;

    let status_str: String = row.try_get("status").map_err(get)?;
    let status = status_str
        .parse::<JobStatus>()
        .map_err(RepositoryError::QueryFailed)?;

    let user_id: Option<Uuid> = row.try_get("user_id").map_err(get)?;
    let guest_id: Option<Uuid> = row.try_get("guest_id").map_err(get)?;
    let owner = match (user_id, guest_id) {
        (Some(id), _) => JobOwner::User(UserId::from_uuid(id)),
        (None, Some(id)) => JobOwner::Guest(GuestId::from_uuid(id)),
        (None, None) => {
            return Err(RepositoryError::QueryFailed("job has no owner".to_string()));
        }
    };

    let input_path: String = row.try_get("input_path").map_err(get)?;
    let output_path: Option<String> = row.try_get("output_path").map_err(get)?;

    Ok(AudioJob {
        id: JobId::from_uuid(row.try_get::<Uuid, _>("id").map_err(get)?),
        filename: row.try_get("filename").map_err(get)?,
        original_filename: row.try_get("original_filename").map_err(get)?,
        file_size: row.try_get::<i64, _>("file_size").map_err(get)? as u64,
        format,
        properties: AudioProperties {
            sample_rate: row
                .try_get::<Option<i32>, _>("sample_rate")
                .map_err(get)?
                .map(|v| v as u32),
            channels: row
                .try_get::<Option<i32>, _>("channels")
                .map_err(get)?
                .map(|v| v as u16),
            duration_secs: row.try_get("duration_secs").map_err(get)?,
        },
        processing_type: row.try_get("processing_type").map_err(get)?,
        input_path: StoragePath::from_raw(input_path),
        output_path: output_path.map(StoragePath::from_raw),
        owner,
        status,
        progress: row.try_get("progress").map_err(get)?,
        error_message: row.try_get("error_message").map_err(get)?,
        created_at: row.try_get("created_at").map_err(get)?,
        started_at: row.try_get("started_at").map_err(get)?,
        completed_at: row.try_get("completed_at").map_err(get)?,
        expires_at: row.try_get("expires_at").map_err(get)?,
    })
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id.as_uuid()))]
    async fn create(&self, job: &AudioJob) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO audio_jobs (
                id, filename, original_filename, file_size, format, sample_rate,
                channels, duration_secs, processing_type, input_path, output_path,
                user_id, guest_id, status, progress, error_message,
                created_at, started_at, completed_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(&job.filename)
        .bind(&job.original_filename)
        .bind(job.file_size as i64)
        .bind(job.format.extension())
        .bind(job.properties.sample_rate.map(|v| v as i32))
        .bind(job.properties.channels.map(i32::from))
        .bind(job.properties.duration_secs)
        .bind(&job.processing_type)
        .bind(job.input_path.as_str())
        .bind(job.output_path.as_ref().map(|p| p.as_str().to_string()))
        .bind(job.owner.user_id().map(|id| id.as_uuid()))
        .bind(job.owner.guest_id().map(|id| id.as_uuid()))
        .bind(job.status.as_str())
        .bind(job.progress)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id.as_uuid()))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<AudioJob>, RepositoryError> {
        let query = format!("SELECT {} FROM audio_jobs WHERE id = $1", JOB_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| job_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(job_id = %id.as_uuid()))]
    async fn mark_processing(&self, id: JobId) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE audio_jobs
            SET status = 'processing', started_at = $1
            WHERE id = $2 AND status = 'pending'
            "#,
        )
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id.as_uuid()))]
    async fn set_progress(&self, id: JobId, progress: f64) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE audio_jobs SET progress = $1 WHERE id = $2")
            .bind(progress)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id.as_uuid()))]
    async fn mark_completed(
        &self,
        id: JobId,
        output_path: &StoragePath,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE audio_jobs
            SET status = 'completed', output_path = $1, progress = 1.0, completed_at = $2
            WHERE id = $3
            "#,
        )
        .bind(output_path.as_str())
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self, error_message), fields(job_id = %id.as_uuid()))]
    async fn mark_failed(&self, id: JobId, error_message: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE audio_jobs
            SET status = 'failed', error_message = $1, completed_at = $2
            WHERE id = $3
            "#,
        )
        .bind(error_message)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<AudioJob>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {}
            FROM audio_jobs
            WHERE expires_at < $1 AND status <> 'expired'
            ORDER BY expires_at
            LIMIT $2
            "#,
            JOB_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(now)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(job_from_row).collect()
    }

    #[instrument(skip(self), fields(job_id = %id.as_uuid()))]
    async fn mark_expired(&self, id: JobId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE audio_jobs SET status = 'expired' WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
