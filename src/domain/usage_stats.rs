use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::UserId;

/// Accumulated per-user usage counters. Byte and second totals are kept raw;
/// presentation converts to MB / minutes.
#[derive(Debug, Clone)]
pub struct UsageStats {
    pub user_id: UserId,
    pub total_files_uploaded: i64,
    pub total_files_processed: i64,
    pub total_files_failed: i64,
    pub total_files_downloaded: i64,
    pub total_input_bytes: i64,
    pub total_output_bytes: i64,
    pub total_processing_secs: f64,
    pub processing_types_count: HashMap<String, i64>,
    pub first_upload_at: Option<DateTime<Utc>>,
    pub last_upload_at: Option<DateTime<Utc>>,
    pub last_download_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl UsageStats {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            total_files_uploaded: 0,
            total_files_processed: 0,
            total_files_failed: 0,
            total_files_downloaded: 0,
            total_input_bytes: 0,
            total_output_bytes: 0,
            total_processing_secs: 0.0,
            processing_types_count: HashMap::new(),
            first_upload_at: None,
            last_upload_at: None,
            last_download_at: None,
            updated_at: Utc::now(),
        }
    }
}
