use std::fmt;

use super::job::JobId;
use super::AudioFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath(String);

impl StoragePath {
    pub fn upload(job_id: &JobId, format: AudioFormat) -> Self {
        Self(format!("uploads/{}.{}", job_id.as_uuid(), format.extension()))
    }

    pub fn output(job_id: &JobId) -> Self {
        Self(format!("outputs/{}.wav", job_id.as_uuid()))
    }

    pub fn from_raw(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
