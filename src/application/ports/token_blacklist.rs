use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryError;

/// Revoked-token registry consulted on every authenticated request. Entries
/// become irrelevant once the token itself expires, so a periodic purge keeps
/// the table bounded.
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    async fn insert(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), RepositoryError>;

    async fn contains(&self, token: &str) -> Result<bool, RepositoryError>;

    /// Removes entries whose token expiry is in the past. Returns the number
    /// of purged entries.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}
