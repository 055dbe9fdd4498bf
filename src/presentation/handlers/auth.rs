use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::application::ports::{RepositoryError, TokenKind};
use crate::domain::{User, UserEvent};
use crate::infrastructure::auth::generate_one_time_token;
use crate::presentation::extract::CurrentUser;
use crate::presentation::state::AppState;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_uuid().to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            is_active: user.is_active,
            is_verified: user.is_verified,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn internal_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// 401 with the `WWW-Authenticate: Bearer` challenge header.
fn unauthorized(message: impl Into<String>) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, "Bearer".parse().unwrap());
    response
}

fn message_ok(message: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: message.into(),
        }),
    )
        .into_response()
}

fn validate_credentials(
    email: &str,
    username: &str,
    password: &str,
) -> Result<(), &'static str> {
    let (local, domain) = email.split_once('@').ok_or("Invalid email address")?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err("Invalid email address");
    }
    validate_username(username)?;
    validate_password(password)
}

fn validate_username(username: &str) -> Result<(), &'static str> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err("Username must be between 3 and 50 characters");
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), &'static str> {
    let len = password.chars().count();
    if !(8..=72).contains(&len) {
        return Err("Password must be between 8 and 72 characters");
    }
    Ok(())
}

/// Argon2 is deliberately slow; keep it off the async runtime threads.
async fn hash_password(state: &AppState, password: String) -> Result<String, String> {
    let hasher = Arc::clone(&state.password_hasher);
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

async fn verify_password(state: &AppState, password: String, password_hash: String) -> bool {
    let hasher = Arc::clone(&state.password_hasher);
    tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
        .await
        .unwrap_or(false)
}

#[tracing::instrument(skip(state, request))]
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> impl IntoResponse {
    if let Err(message) =
        validate_credentials(&request.email, &request.username, &request.password)
    {
        return bad_request(message);
    }

    match state.users.get_by_email(&request.email).await {
        Ok(Some(_)) => return bad_request("Email already registered"),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Email lookup failed");
            return internal_error("Failed to create user");
        }
    }

    match state.users.get_by_username(&request.username).await {
        Ok(Some(_)) => return bad_request("Username already taken"),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Username lookup failed");
            return internal_error("Failed to create user");
        }
    }

    let password_hash = match hash_password(&state, request.password).await {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "Password hashing failed");
            return internal_error("Failed to create user");
        }
    };

    let verification_token = generate_one_time_token();
    let verification_expires =
        Utc::now() + Duration::hours(state.settings.auth.verification_token_expire_hours);

    let user = User::new(
        request.email,
        request.username,
        password_hash,
        verification_token.clone(),
        verification_expires,
    );

    match state.users.create(&user).await {
        Ok(()) => {}
        // Unique-index race between the lookup and the insert.
        Err(RepositoryError::ConstraintViolation(_)) => {
            return bad_request("Email or username already registered");
        }
        Err(e) => {
            tracing::error!(error = %e, "User insert failed");
            return internal_error("Failed to create user");
        }
    }

    state.events.publish(UserEvent::Registered {
        user_id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        verification_token,
        verification_token_expires_at: verification_expires,
    });

    tracing::info!(user_id = %user.id.as_uuid(), "User registered");

    (StatusCode::CREATED, Json(UserResponse::from(&user))).into_response()
}

#[tracing::instrument(skip(state, request))]
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    let user = match state
        .users
        .get_by_email_or_username(&request.username_or_email)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "Login lookup failed");
            return internal_error("Login failed");
        }
    };

    let Some(user) = user else {
        return unauthorized("Incorrect username/email or password");
    };

    if !verify_password(&state, request.password, user.password_hash.clone()).await {
        return unauthorized("Incorrect username/email or password");
    }

    if !user.is_active {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "User account is inactive".to_string(),
            }),
        )
            .into_response();
    }

    match state.token_issuer.issue_pair(user.id, &user.username) {
        Ok(pair) => (
            StatusCode::OK,
            Json(TokenResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
                token_type: "bearer".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Token issuance failed");
            internal_error("Login failed")
        }
    }
}

/// Blacklists the presented token until its natural expiry. Requires only a
/// decodable token, not a live account, so a deactivated user can still log
/// out.
#[tracing::instrument(skip(state, headers))]
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(token) = token else {
        return unauthorized("Not authenticated");
    };

    let claims = match state.token_issuer.decode(&token) {
        Ok(claims) => claims,
        Err(_) => return unauthorized("Invalid token"),
    };

    match state.token_blacklist.contains(&token).await {
        Ok(true) => return bad_request("Token already invalidated"),
        Ok(false) => {}
        Err(e) => {
            tracing::error!(error = %e, "Blacklist lookup failed");
            return internal_error("Logout failed");
        }
    }

    if let Err(e) = state
        .token_blacklist
        .insert(&token, claims.expires_at)
        .await
    {
        tracing::error!(error = %e, "Blacklist insert failed");
        return internal_error("Logout failed");
    }

    message_ok("Successfully logged out")
}

#[tracing::instrument(skip(state, request))]
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> impl IntoResponse {
    let claims = match state.token_issuer.decode(&request.refresh_token) {
        Ok(claims) => claims,
        Err(_) => return unauthorized("Invalid refresh token"),
    };

    if claims.kind != TokenKind::Refresh {
        return unauthorized("Invalid token type");
    }

    match state.token_blacklist.contains(&request.refresh_token).await {
        Ok(true) => return unauthorized("Token has been revoked"),
        Ok(false) => {}
        Err(e) => {
            tracing::error!(error = %e, "Blacklist lookup failed");
            return internal_error("Token refresh failed");
        }
    }

    let user = match state.users.get_by_id(claims.user_id).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed");
            return internal_error("Token refresh failed");
        }
    };

    let Some(user) = user.filter(|u| u.is_active) else {
        return unauthorized("User not found or inactive");
    };

    match state.token_issuer.issue_pair(user.id, &user.username) {
        Ok(pair) => (
            StatusCode::OK,
            Json(TokenResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
                token_type: "bearer".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Token issuance failed");
            internal_error("Token refresh failed")
        }
    }
}

#[tracing::instrument(skip(state, request))]
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> impl IntoResponse {
    let user = match state.users.get_by_verification_token(&request.token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "Verification token lookup failed");
            return internal_error("Email verification failed");
        }
    };

    let Some(user) = user else {
        return bad_request("Invalid verification token");
    };

    if user
        .verification_token_expires_at
        .is_some_and(|expires| expires < Utc::now())
    {
        return bad_request("Verification token has expired");
    }

    if let Err(e) = state.users.mark_verified(user.id).await {
        tracing::error!(error = %e, "Verification update failed");
        return internal_error("Email verification failed");
    }

    state.events.publish(UserEvent::Verified {
        user_id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
    });

    message_ok("Email verified successfully")
}

/// Always answers with the same body whether or not the account exists.
#[tracing::instrument(skip(state, request))]
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> impl IntoResponse {
    let user = match state.users.get_by_email(&request.email).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "Email lookup failed");
            return internal_error("Password reset failed");
        }
    };

    if let Some(user) = user.filter(|u| u.is_active) {
        let reset_token = generate_one_time_token();
        let reset_expires =
            Utc::now() + Duration::hours(state.settings.auth.password_reset_token_expire_hours);

        if let Err(e) = state
            .users
            .set_password_reset_token(user.id, &reset_token, reset_expires)
            .await
        {
            tracing::error!(error = %e, "Reset token update failed");
            return internal_error("Password reset failed");
        }

        state.events.publish(UserEvent::PasswordResetRequested {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            reset_token,
            reset_token_expires_at: reset_expires,
        });
    }

    message_ok("If an account with that email exists, a password reset link has been sent")
}

#[tracing::instrument(skip(state, request))]
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    if let Err(message) = validate_password(&request.new_password) {
        return bad_request(message);
    }

    let user = match state
        .users
        .get_by_password_reset_token(&request.token)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "Reset token lookup failed");
            return internal_error("Password reset failed");
        }
    };

    let Some(user) = user else {
        return bad_request("Invalid reset token");
    };

    if user
        .password_reset_token_expires_at
        .is_some_and(|expires| expires < Utc::now())
    {
        return bad_request("Reset token has expired");
    }

    let password_hash = match hash_password(&state, request.new_password).await {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "Password hashing failed");
            return internal_error("Password reset failed");
        }
    };

    if let Err(e) = state.users.update_password_hash(user.id, &password_hash).await {
        tracing::error!(error = %e, "Password update failed");
        return internal_error("Password reset failed");
    }
    if let Err(e) = state.users.clear_password_reset_token(user.id).await {
        tracing::error!(error = %e, "Reset token clear failed");
        return internal_error("Password reset failed");
    }

    message_ok("Password has been reset successfully")
}

/// Same enumeration-safe shape as forgot-password.
#[tracing::instrument(skip(state, request))]
pub async fn resend_verification_handler(
    State(state): State<AppState>,
    Json(request): Json<ResendVerificationRequest>,
) -> impl IntoResponse {
    let user = match state.users.get_by_email(&request.email).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "Email lookup failed");
            return internal_error("Verification resend failed");
        }
    };

    if let Some(user) = user.filter(|u| !u.is_verified && u.is_active) {
        let verification_token = generate_one_time_token();
        let verification_expires =
            Utc::now() + Duration::hours(state.settings.auth.verification_token_expire_hours);

        if let Err(e) = state
            .users
            .set_verification_token(user.id, &verification_token, verification_expires)
            .await
        {
            tracing::error!(error = %e, "Verification token update failed");
            return internal_error("Verification resend failed");
        }

        state.events.publish(UserEvent::Registered {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            verification_token,
            verification_token_expires_at: verification_expires,
        });
    }

    message_ok("If your account requires verification, a new email has been sent")
}

#[tracing::instrument(skip(current_user))]
pub async fn me_handler(current_user: CurrentUser) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(UserResponse::from(&current_user.user)),
    )
        .into_response()
}
