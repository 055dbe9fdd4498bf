use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::ports::{
    JobRepository, RepositoryError, TokenBlacklist, UsageStatsRepository, UserRepository,
};
use crate::domain::{AudioJob, JobId, JobStatus, StoragePath, UsageStats, User, UserId};

/// Map-backed repositories for tests and local scaffolding. They mirror the
/// Postgres implementations closely enough to exercise every handler path,
/// including unique-constraint behavior.

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn find<F>(&self, predicate: F) -> Option<User>
    where
        F: Fn(&User) -> bool,
    {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| predicate(u))
            .cloned()
    }

    fn update<F>(&self, id: UserId, mutate: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id.as_uuid())
            .ok_or_else(|| RepositoryError::NotFound(id.as_uuid().to_string()))?;
        mutate(user);
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(RepositoryError::ConstraintViolation(
                "duplicate email or username".to_string(),
            ));
        }
        users.insert(user.id.as_uuid(), user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.find(|u| u.id == id))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.find(|u| u.email == email))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.find(|u| u.username == username))
    }

    async fn get_by_email_or_username(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self.find(|u| u.email == identifier || u.username == identifier))
    }

    async fn get_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self.find(|u| u.verification_token.as_deref() == Some(token)))
    }

    async fn get_by_password_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self.find(|u| u.password_reset_token.as_deref() == Some(token)))
    }

    async fn update_username(&self, id: UserId, username: &str) -> Result<(), RepositoryError> {
        self.update(id, |u| u.username = username.to_string())
    }

    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        self.update(id, |u| u.password_hash = password_hash.to_string())
    }

    async fn mark_verified(&self, id: UserId) -> Result<(), RepositoryError> {
        self.update(id, |u| {
            u.is_verified = true;
            u.verification_token = None;
            u.verification_token_expires_at = None;
        })
    }

    async fn set_verification_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.update(id, |u| {
            u.verification_token = Some(token.to_string());
            u.verification_token_expires_at = Some(expires_at);
        })
    }

    async fn set_password_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.update(id, |u| {
            u.password_reset_token = Some(token.to_string());
            u.password_reset_token_expires_at = Some(expires_at);
        })
    }

    async fn clear_password_reset_token(&self, id: UserId) -> Result<(), RepositoryError> {
        self.update(id, |u| {
            u.password_reset_token = None;
            u.password_reset_token_expires_at = None;
        })
    }
}

#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<Uuid, AudioJob>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, id: JobId, mutate: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut AudioJob),
    {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&id.as_uuid())
            .ok_or_else(|| RepositoryError::NotFound(id.as_uuid().to_string()))?;
        mutate(job);
        Ok(())
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &AudioJob) -> Result<(), RepositoryError> {
        self.jobs
            .lock()
            .unwrap()
            .insert(job.id.as_uuid(), job.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<AudioJob>, RepositoryError> {
        Ok(self.jobs.lock().unwrap().get(&id.as_uuid()).cloned())
    }

    async fn mark_processing(&self, id: JobId) -> Result<(), RepositoryError> {
        self.update(id, |job| {
            if job.status == JobStatus::Pending {
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
            }
        })
    }

    async fn set_progress(&self, id: JobId, progress: f64) -> Result<(), RepositoryError> {
        self.update(id, |job| job.progress = progress)
    }

    async fn mark_completed(
        &self,
        id: JobId,
        output_path: &StoragePath,
    ) -> Result<(), RepositoryError> {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.output_path = Some(output_path.clone());
            job.progress = 1.0;
            job.completed_at = Some(Utc::now());
        })
    }

    async fn mark_failed(&self, id: JobId, error_message: &str) -> Result<(), RepositoryError> {
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(error_message.to_string());
            job.completed_at = Some(Utc::now());
        })
    }

    async fn list_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<AudioJob>, RepositoryError> {
        let jobs = self.jobs.lock().unwrap();
        let mut expired: Vec<AudioJob> = jobs
            .values()
            .filter(|j| j.expires_at < now && j.status != JobStatus::Expired)
            .cloned()
            .collect();
        expired.sort_by_key(|j| j.expires_at);
        expired.truncate(limit);
        Ok(expired)
    }

    async fn mark_expired(&self, id: JobId) -> Result<(), RepositoryError> {
        self.update(id, |job| job.status = JobStatus::Expired)
    }
}

#[derive(Default)]
pub struct InMemoryTokenBlacklist {
    tokens: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryTokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryTokenBlacklist {
    async fn insert(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), expires_at);
        Ok(())
    }

    async fn contains(&self, token: &str) -> Result<bool, RepositoryError> {
        Ok(self.tokens.lock().unwrap().contains_key(token))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, expires_at| *expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryUsageStatsRepository {
    stats: Mutex<HashMap<Uuid, UsageStats>>,
}

impl InMemoryUsageStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, user_id: UserId, mutate: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut UsageStats),
    {
        let mut stats = self.stats.lock().unwrap();
        let entry = stats
            .entry(user_id.as_uuid())
            .or_insert_with(|| UsageStats::empty(user_id));
        mutate(entry);
        entry.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UsageStatsRepository for InMemoryUsageStatsRepository {
    async fn get(&self, user_id: UserId) -> Result<Option<UsageStats>, RepositoryError> {
        Ok(self.stats.lock().unwrap().get(&user_id.as_uuid()).cloned())
    }

    async fn record_upload(
        &self,
        user_id: UserId,
        input_bytes: i64,
        processing_type: &str,
    ) -> Result<(), RepositoryError> {
        self.update(user_id, |s| {
            let now = Utc::now();
            s.total_files_uploaded += 1;
            s.total_input_bytes += input_bytes;
            *s.processing_types_count
                .entry(processing_type.to_string())
                .or_insert(0) += 1;
            s.first_upload_at.get_or_insert(now);
            s.last_upload_at = Some(now);
        })
    }

    async fn record_processed(
        &self,
        user_id: UserId,
        output_bytes: i64,
        processing_secs: f64,
    ) -> Result<(), RepositoryError> {
        self.update(user_id, |s| {
            s.total_files_processed += 1;
            s.total_output_bytes += output_bytes;
            s.total_processing_secs += processing_secs;
        })
    }

    async fn record_failure(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.update(user_id, |s| s.total_files_failed += 1)
    }

    async fn record_download(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.update(user_id, |s| {
            s.total_files_downloaded += 1;
            s.last_download_at = Some(Utc::now());
        })
    }
}
