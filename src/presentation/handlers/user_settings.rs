use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::presentation::extract::CurrentUser;
use crate::presentation::state::AppState;

#[derive(Deserialize)]
pub struct UsernameUpdateRequest {
    pub new_username: String,
}

#[derive(Deserialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct UserSettingsResponse {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct UsageStatsResponse {
    pub total_files_uploaded: i64,
    pub total_files_processed: i64,
    pub total_files_failed: i64,
    pub total_files_downloaded: i64,
    pub total_input_size_mb: f64,
    pub total_output_size_mb: f64,
    pub total_processing_time_minutes: f64,
    pub processing_types_count: HashMap<String, i64>,
    pub first_upload_at: Option<String>,
    pub last_upload_at: Option<String>,
    pub last_download_at: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
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

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[tracing::instrument(skip(current_user))]
pub async fn user_settings_handler(current_user: CurrentUser) -> impl IntoResponse {
    let user = current_user.user;
    (
        StatusCode::OK,
        Json(UserSettingsResponse {
            user_id: user.id.as_uuid().to_string(),
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            is_verified: user.is_verified,
            created_at: user.created_at.to_rfc3339(),
        }),
    )
        .into_response()
}

#[tracing::instrument(skip(state, current_user, request))]
pub async fn update_username_handler(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<UsernameUpdateRequest>,
) -> impl IntoResponse {
    let new_username = request.new_username.trim().to_string();

    let len = new_username.chars().count();
    if !(3..=50).contains(&len) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Username must be between 3 and 50 characters",
        );
    }

    if new_username == current_user.user.username {
        return error_response(
            StatusCode::BAD_REQUEST,
            "New username is the same as current username",
        );
    }

    match state.users.get_by_username(&new_username).await {
        Ok(Some(_)) => return error_response(StatusCode::BAD_REQUEST, "Username already taken"),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Username lookup failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Username update failed");
        }
    }

    if let Err(e) = state
        .users
        .update_username(current_user.user.id, &new_username)
        .await
    {
        tracing::error!(error = %e, "Username update failed");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Username update failed");
    }

    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Username updated successfully".to_string(),
        }),
    )
        .into_response()
}

#[tracing::instrument(skip(state, current_user, request))]
pub async fn change_password_handler(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<PasswordChangeRequest>,
) -> impl IntoResponse {
    let len = request.new_password.chars().count();
    if !(8..=72).contains(&len) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Password must be between 8 and 72 characters",
        );
    }

    let hasher = Arc::clone(&state.password_hasher);
    let stored_hash = current_user.user.password_hash.clone();
    let current_password = request.current_password;
    let new_password = request.new_password;

    // One blocking hop for both verifications and the new hash.
    let outcome = tokio::task::spawn_blocking(move || {
        if !hasher.verify(&current_password, &stored_hash) {
            return Err(PasswordChangeError::WrongCurrent);
        }
        if hasher.verify(&new_password, &stored_hash) {
            return Err(PasswordChangeError::SameAsCurrent);
        }
        hasher
            .hash(&new_password)
            .map_err(|e| PasswordChangeError::Hashing(e.to_string()))
    })
    .await;

    let new_hash = match outcome {
        Ok(Ok(hash)) => hash,
        Ok(Err(PasswordChangeError::WrongCurrent)) => {
            return error_response(StatusCode::UNAUTHORIZED, "Current password is incorrect");
        }
        Ok(Err(PasswordChangeError::SameAsCurrent)) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "New password must be different from current password",
            );
        }
        Ok(Err(PasswordChangeError::Hashing(e))) => {
            tracing::error!(error = %e, "Password hashing failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Password change failed");
        }
        Err(e) => {
            tracing::error!(error = %e, "Password task failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Password change failed");
        }
    };

    if let Err(e) = state
        .users
        .update_password_hash(current_user.user.id, &new_hash)
        .await
    {
        tracing::error!(error = %e, "Password update failed");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Password change failed");
    }

    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password changed successfully".to_string(),
        }),
    )
        .into_response()
}

enum PasswordChangeError {
    WrongCurrent,
    SameAsCurrent,
    Hashing(String),
}

/// Byte totals are reported in MB and processing time in minutes; a user
/// without a stats row gets a zeroed payload.
#[tracing::instrument(skip(state, current_user))]
pub async fn usage_stats_handler(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> impl IntoResponse {
    let stats = match state.usage.stats_for(current_user.user.id).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(error = %e, "Usage stats lookup failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch usage statistics",
            );
        }
    };

    let response = match stats {
        Some(stats) => UsageStatsResponse {
            total_files_uploaded: stats.total_files_uploaded,
            total_files_processed: stats.total_files_processed,
            total_files_failed: stats.total_files_failed,
            total_files_downloaded: stats.total_files_downloaded,
            total_input_size_mb: round2(stats.total_input_bytes as f64 / 1024.0 / 1024.0),
            total_output_size_mb: round2(stats.total_output_bytes as f64 / 1024.0 / 1024.0),
            total_processing_time_minutes: round2(stats.total_processing_secs / 60.0),
            processing_types_count: stats.processing_types_count,
            first_upload_at: stats.first_upload_at.map(|t| t.to_rfc3339()),
            last_upload_at: stats.last_upload_at.map(|t| t.to_rfc3339()),
            last_download_at: stats.last_download_at.map(|t| t.to_rfc3339()),
        },
        None => UsageStatsResponse {
            total_files_uploaded: 0,
            total_files_processed: 0,
            total_files_failed: 0,
            total_files_downloaded: 0,
            total_input_size_mb: 0.0,
            total_output_size_mb: 0.0,
            total_processing_time_minutes: 0.0,
            processing_types_count: HashMap::new(),
            first_upload_at: None,
            last_upload_at: None,
            last_download_at: None,
        },
    };

    (StatusCode::OK, Json(response)).into_response()
}
