use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::application::ports::TokenKind;
use crate::domain::{GuestId, User};
use crate::presentation::state::AppState;

pub const GUEST_ID_HEADER: &str = "x-guest-id";

/// Authenticated account, extracted from a bearer access token. The raw
/// token is kept so logout can blacklist it.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Identity attached to an audio job request: an account or a guest session.
pub enum Caller {
    User(User),
    Guest(GuestId),
}

/// `Caller` that tolerates anonymous requests; upload mints a fresh guest
/// session when no identity is presented.
pub struct OptionalCaller(pub Option<Caller>);

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub struct AuthRejection {
    status: StatusCode,
    message: String,
}

impl AuthRejection {
    fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, "Bearer".parse().unwrap());
        }
        response
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn guest_header(parts: &Parts) -> Option<GuestId> {
    parts
        .headers
        .get(GUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Resolves a bearer token to an active account. Rejects refresh tokens,
/// revoked tokens, and tokens of unknown or deactivated users.
async fn resolve_user(state: &AppState, token: &str) -> Result<User, AuthRejection> {
    let claims = state
        .token_issuer
        .decode(token)
        .map_err(|e| AuthRejection::unauthorized(format!("Invalid token: {}", e)))?;

    if claims.kind != TokenKind::Access {
        return Err(AuthRejection::unauthorized("Invalid token type"));
    }

    let revoked = state.token_blacklist.contains(token).await.map_err(|e| {
        tracing::error!(error = %e, "Token blacklist lookup failed");
        AuthRejection::unauthorized("Authentication unavailable")
    })?;
    if revoked {
        return Err(AuthRejection::unauthorized("Token has been revoked"));
    }

    let user = state.users.get_by_id(claims.user_id).await.map_err(|e| {
        tracing::error!(error = %e, "User lookup failed");
        AuthRejection::unauthorized("Authentication unavailable")
    })?;

    match user {
        Some(user) if user.is_active => Ok(user),
        _ => Err(AuthRejection::unauthorized("User not found or inactive")),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| AuthRejection::unauthorized("Not authenticated"))?;
        let user = resolve_user(state, &token).await?;
        Ok(CurrentUser { user, token })
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts) {
            return resolve_user(state, &token).await.map(Caller::User);
        }
        if let Some(guest_id) = guest_header(parts) {
            return Ok(Caller::Guest(guest_id));
        }
        Err(AuthRejection::forbidden(
            "No user or guest identity provided",
        ))
    }
}

impl FromRequestParts<AppState> for OptionalCaller {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts) {
            return resolve_user(state, &token).await.map(|user| {
                OptionalCaller(Some(Caller::User(user)))
            });
        }
        Ok(OptionalCaller(guest_header(parts).map(Caller::Guest)))
    }
}
