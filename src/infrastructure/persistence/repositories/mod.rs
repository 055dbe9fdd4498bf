mod memory;
mod pg_job_repository;
mod pg_token_blacklist;
mod pg_usage_stats_repository;
mod pg_user_repository;

pub use memory::{
    InMemoryJobRepository, InMemoryTokenBlacklist, InMemoryUsageStatsRepository,
    InMemoryUserRepository,
};
pub use pg_job_repository::PgJobRepository;
pub use pg_token_blacklist::PgTokenBlacklist;
pub use pg_usage_stats_repository::PgUsageStatsRepository;
pub use pg_user_repository::PgUserRepository;

use crate::application::ports::RepositoryError;

pub(crate) fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::ConstraintViolation(db.to_string())
        }
        _ => RepositoryError::QueryFailed(e.to_string()),
    }
}
