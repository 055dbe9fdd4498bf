use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Duration;
use futures::StreamExt;
use serde::Serialize;
use uuid::Uuid;

use crate::application::services::ProcessingMessage;
use crate::domain::{AudioFormat, AudioJob, GuestId, JobId, JobOwner, JobStatus};
use crate::presentation::extract::{Caller, OptionalCaller};
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub status: String,
    pub filename: String,
    pub original_filename: String,
    pub file_size: u64,
    pub file_format: String,
    pub duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub user_id: Option<String>,
    pub guest_id: Option<String>,
    pub created_at: String,
    pub expires_at: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub progress: f64,
    pub filename: String,
    pub original_filename: String,
    pub processing_type: String,
    pub error_message: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub output_available: bool,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

const ALLOWED_FORMATS: &str = "wav, mp3, flac, ogg, m4a";

#[tracing::instrument(skip(state, caller, multipart))]
pub async fn upload_handler(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let field = match multipart.next_field().await {
        Ok(Some(f)) => f,
        Ok(None) => {
            tracing::warn!("Upload request with no file");
            return error_response(StatusCode::BAD_REQUEST, "No file uploaded");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read multipart");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read multipart: {}", e),
            );
        }
    };

    let Some(original_filename) = field.file_name().map(str::to_string) else {
        return error_response(StatusCode::BAD_REQUEST, "No file uploaded");
    };

    let Some(format) = AudioFormat::from_filename(&original_filename) else {
        tracing::warn!(filename = %original_filename, "Unsupported file format");
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Unsupported file format. Allowed formats: {}",
                ALLOWED_FORMATS
            ),
        );
    };

    let data = match field.bytes().await {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read file bytes");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read file: {}", e),
            );
        }
    };

    let max_bytes = state.settings.audio.max_file_size_mb * 1024 * 1024;
    if data.len() as u64 > max_bytes {
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "File too large. Maximum size: {}MB",
                state.settings.audio.max_file_size_mb
            ),
        );
    }

    let properties = state.audio_probe.probe(&data, format);

    let owner = match caller {
        Some(Caller::User(user)) => JobOwner::User(user.id),
        Some(Caller::Guest(guest_id)) => JobOwner::Guest(guest_id),
        None => JobOwner::Guest(GuestId::new()),
    };

    let job = AudioJob::new(
        original_filename,
        data.len() as u64,
        format,
        properties,
        owner,
        Duration::hours(state.settings.audio.file_expiry_hours),
    );

    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(data) }).boxed();
    if let Err(e) = state.media_store.store(&job.input_path, stream).await {
        tracing::error!(error = %e, "Failed to stage upload");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to save file: {}", e),
        );
    }

    if let Err(e) = state.jobs.create(&job).await {
        tracing::error!(error = %e, "Failed to create job record");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to create job: {}", e),
        );
    }

    // Enqueue failure does not fail the upload; the job record carries the
    // failure state instead.
    let mut status = JobStatus::Pending;
    if let Err(e) = state
        .processing_queue
        .try_send(ProcessingMessage { job_id: job.id })
    {
        tracing::error!(error = %e, "Failed to enqueue processing job");
        let error_msg = format!("Failed to queue processing task: {}", e);
        if let Err(mark_err) = state.jobs.mark_failed(job.id, &error_msg).await {
            tracing::error!(error = %mark_err, "Failed to mark job failed");
        }
        status = JobStatus::Failed;
    }

    state
        .usage
        .record_upload(&job.owner, job.file_size as i64, &job.processing_type)
        .await;

    tracing::info!(
        job_id = %job.id.as_uuid(),
        filename = %job.original_filename,
        bytes = job.file_size,
        "Audio upload accepted"
    );

    (
        StatusCode::CREATED,
        Json(UploadResponse {
            job_id: job.id.as_uuid().to_string(),
            status: status.to_string(),
            filename: job.filename.clone(),
            original_filename: job.original_filename.clone(),
            file_size: job.file_size,
            file_format: job.format.extension().to_string(),
            duration: job.properties.duration_secs,
            sample_rate: job.properties.sample_rate,
            channels: job.properties.channels,
            user_id: job.owner.user_id().map(|id| id.as_uuid().to_string()),
            guest_id: job.owner.guest_id().map(|id| id.to_string()),
            created_at: job.created_at.to_rfc3339(),
            expires_at: job.expires_at.to_rfc3339(),
            message: "File uploaded successfully. Processing will begin shortly.".to_string(),
        }),
    )
        .into_response()
}

/// Loads a job and enforces ownership. Shared by status and download.
async fn fetch_owned_job(
    state: &AppState,
    caller: &Caller,
    job_id: &str,
) -> Result<AudioJob, Response> {
    let uuid = match Uuid::parse_str(job_id) {
        Ok(u) => u,
        Err(_) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid job ID: {}", job_id),
            ));
        }
    };

    let job = match state.jobs.get_by_id(JobId::from_uuid(uuid)).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return Err(error_response(StatusCode::NOT_FOUND, "Job not found"));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch job");
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch job: {}", e),
            ));
        }
    };

    let authorized = match caller {
        Caller::User(user) => job.is_owned_by_user(user.id),
        Caller::Guest(guest_id) => job.is_owned_by_guest(*guest_id),
    };
    if !authorized {
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "Not authorized to access this job",
        ));
    }

    Ok(job)
}

#[tracing::instrument(skip(state, caller))]
pub async fn job_status_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let job = match fetch_owned_job(&state, &caller, &job_id).await {
        Ok(job) => job,
        Err(response) => return response,
    };

    (
        StatusCode::OK,
        Json(JobStatusResponse {
            job_id: job.id.as_uuid().to_string(),
            status: job.status.to_string(),
            progress: job.progress,
            filename: job.filename.clone(),
            original_filename: job.original_filename.clone(),
            processing_type: job.processing_type.clone(),
            error_message: job.error_message.clone(),
            created_at: job.created_at.to_rfc3339(),
            started_at: job.started_at.map(|t| t.to_rfc3339()),
            completed_at: job.completed_at.map(|t| t.to_rfc3339()),
            output_available: job.output_available(),
        }),
    )
        .into_response()
}

#[tracing::instrument(skip(state, caller))]
pub async fn download_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let job = match fetch_owned_job(&state, &caller, &job_id).await {
        Ok(job) => job,
        Err(response) => return response,
    };

    if job.status != JobStatus::Completed {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Job is not completed yet. Current status: {}", job.status),
        );
    }

    let Some(output_path) = &job.output_path else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Output file path not set");
    };

    let data = match state.media_store.fetch(output_path).await {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(error = %e, path = %output_path, "Processed file missing");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processed file not found on server",
            );
        }
    };

    state.usage.record_download(&job.owner).await;

    // Download name: {original stem}_updated{original extension}.
    let (stem, ext) = match job.original_filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (job.original_filename.as_str(), String::new()),
    };
    let download_filename = format!("{}_updated{}", stem, ext);

    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                AudioFormat::Wav.as_mime().to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_filename),
            ),
        ],
        data,
    )
        .into_response()
}
