use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{User, UserId};

use super::RepositoryError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Login lookup: matches either the email or the username column.
    async fn get_by_email_or_username(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, RepositoryError>;

    async fn get_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError>;

    async fn get_by_password_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError>;

    async fn update_username(&self, id: UserId, username: &str) -> Result<(), RepositoryError>;

    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError>;

    /// Marks the account verified and clears the verification token.
    async fn mark_verified(&self, id: UserId) -> Result<(), RepositoryError>;

    async fn set_verification_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn set_password_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn clear_password_reset_token(&self, id: UserId) -> Result<(), RepositoryError>;
}
