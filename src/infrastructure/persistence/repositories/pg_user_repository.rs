use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{RepositoryError, UserRepository};
use crate::domain::{User, UserId};

use super::map_sqlx_error;

const USER_COLUMNS: &str = "id, email, username, password_hash, is_active, is_verified, \
     verification_token, verification_token_expires_at, \
     password_reset_token, password_reset_token_expires_at, \
     created_at, updated_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(
        &self,
        clause: &str,
        value: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, clause);
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| user_from_row(&r)).transpose()
    }
}

fn user_from_row(row: &PgRow) -> Result<User, RepositoryError> {
    let get = |e: sqlx::Error| RepositoryError::QueryFailed(e.to_string());
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id").map_err(get)?),
        email: row.try_get("email").map_err(get)?,
        username: row.try_get("username").map_err(get)?,
        password_hash: row.try_get("password_hash").map_err(get)?,
        is_active: row.try_get("is_active").map_err(get)?,
        is_verified: row.try_get("is_verified").map_err(get)?,
        verification_token: row.try_get("verification_token").map_err(get)?,
        verification_token_expires_at: row
            .try_get("verification_token_expires_at")
            .map_err(get)?,
        password_reset_token: row.try_get("password_reset_token").map_err(get)?,
        password_reset_token_expires_at: row
            .try_get("password_reset_token_expires_at")
            .map_err(get)?,
        created_at: row.try_get("created_at").map_err(get)?,
        updated_at: row.try_get("updated_at").map_err(get)?,
    })
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id.as_uuid()))]
    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, username, password_hash, is_active, is_verified,
                verification_token, verification_token_expires_at,
                password_reset_token, password_reset_token_expires_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_verified)
        .bind(&user.verification_token)
        .bind(user.verification_token_expires_at)
        .bind(&user.password_reset_token)
        .bind(user.password_reset_token_expires_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id.as_uuid()))]
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| user_from_row(&r)).transpose()
    }

    #[instrument(skip(self, email))]
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("email = $1", email).await
    }

    #[instrument(skip(self))]
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("username = $1", username).await
    }

    #[instrument(skip(self, identifier))]
    async fn get_by_email_or_username(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("email = $1 OR username = $1", identifier)
            .await
    }

    #[instrument(skip(self, token))]
    async fn get_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("verification_token = $1", token).await
    }

    #[instrument(skip(self, token))]
    async fn get_by_password_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("password_reset_token = $1", token).await
    }

    #[instrument(skip(self), fields(user_id = %id.as_uuid()))]
    async fn update_username(&self, id: UserId, username: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET username = $1, updated_at = $2 WHERE id = $3")
            .bind(username)
            .bind(Utc::now())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self, password_hash), fields(user_id = %id.as_uuid()))]
    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id.as_uuid()))]
    async fn mark_verified(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_verified = TRUE,
                verification_token = NULL,
                verification_token_expires_at = NULL,
                updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(user_id = %id.as_uuid()))]
    async fn set_verification_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE users
            SET verification_token = $1,
                verification_token_expires_at = $2,
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(user_id = %id.as_uuid()))]
    async fn set_password_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = $1,
                password_reset_token_expires_at = $2,
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id.as_uuid()))]
    async fn clear_password_reset_token(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = NULL,
                password_reset_token_expires_at = NULL,
                updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
