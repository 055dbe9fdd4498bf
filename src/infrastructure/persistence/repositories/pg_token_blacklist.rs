use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{RepositoryError, TokenBlacklist};

use super::map_sqlx_error;

pub struct PgTokenBlacklist {
    pool: PgPool,
}

impl PgTokenBlacklist {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenBlacklist for PgTokenBlacklist {
    #[instrument(skip(self, token))]
    async fn insert(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO token_blacklist (token, expires_at, revoked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO NOTHING
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn contains(&self, token: &str) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM token_blacklist WHERE token = $1)")
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.try_get::<bool, _>(0)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
