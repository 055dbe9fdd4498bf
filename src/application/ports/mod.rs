mod audio_probe;
mod audio_processor;
mod event_publisher;
mod job_repository;
mod media_store;
mod password_hasher;
mod repository_error;
mod token_blacklist;
mod token_issuer;
mod usage_stats_repository;
mod user_repository;

pub use audio_probe::AudioProbe;
pub use audio_processor::{AudioProcessor, AudioProcessorError, ProcessedAudio};
pub use event_publisher::EventPublisher;
pub use job_repository::JobRepository;
pub use media_store::{MediaStore, MediaStoreError};
pub use password_hasher::{PasswordHashError, PasswordHasher};
pub use repository_error::RepositoryError;
pub use token_blacklist::TokenBlacklist;
pub use token_issuer::{TokenClaims, TokenError, TokenIssuer, TokenKind, TokenPair};
pub use usage_stats_repository::UsageStatsRepository;
pub use user_repository::UserRepository;
