use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{AudioFormat, AudioProperties, GuestId, JobStatus, StoragePath, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who submitted a job. A job belongs to exactly one identity; status and
/// download checks compare against the caller's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOwner {
    User(UserId),
    Guest(GuestId),
}

impl JobOwner {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            JobOwner::User(id) => Some(*id),
            JobOwner::Guest(_) => None,
        }
    }

    pub fn guest_id(&self) -> Option<GuestId> {
        match self {
            JobOwner::User(_) => None,
            JobOwner::Guest(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioJob {
    pub id: JobId,
    pub filename: String,
    pub original_filename: String,
    pub file_size: u64,
    pub format: AudioFormat,
    pub properties: AudioProperties,
    pub processing_type: String,
    pub input_path: StoragePath,
    pub output_path: Option<StoragePath>,
    pub owner: JobOwner,
    pub status: JobStatus,
    pub progress: f64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl AudioJob {
    pub fn new(
        original_filename: String,
        file_size: u64,
        format: AudioFormat,
        properties: AudioProperties,
        owner: JobOwner,
        expiry: Duration,
    ) -> Self {
        let id = JobId::new();
        let now = Utc::now();
        Self {
            id,
            filename: format!("{}.{}", id.as_uuid(), format.extension()),
            original_filename,
            file_size,
            format,
            properties,
            processing_type: "speech_enhancement".to_string(),
            input_path: StoragePath::upload(&id, format),
            output_path: None,
            owner,
            status: JobStatus::Pending,
            progress: 0.0,
            error_message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            expires_at: now + expiry,
        }
    }

    /// A job is downloadable only when processing finished and an output
    /// object was recorded.
    pub fn output_available(&self) -> bool {
        self.status == JobStatus::Completed && self.output_path.is_some()
    }

    pub fn is_owned_by_user(&self, user_id: UserId) -> bool {
        self.owner.user_id() == Some(user_id)
    }

    pub fn is_owned_by_guest(&self, guest_id: GuestId) -> bool {
        self.owner.guest_id() == Some(guest_id)
    }
}
