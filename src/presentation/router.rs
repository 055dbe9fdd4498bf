use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    change_password_handler, download_handler, forgot_password_handler, guest_session_handler,
    health_handler, job_status_handler, login_handler, logout_handler, me_handler,
    refresh_handler, resend_verification_handler, reset_password_handler, root_handler,
    signup_handler, update_username_handler, upload_handler, usage_stats_handler,
    user_settings_handler, verify_email_handler,
};
use crate::presentation::state::AppState;

pub fn create_router(state: AppState) -> Router {
    // Leave headroom above the configured limit so the handler, not the body
    // reader, produces the 413.
    let body_limit = (state.settings.audio.max_file_size_mb as usize + 8) * 1024 * 1024;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/verify-email", post(verify_email_handler))
        .route("/auth/resend-verification", post(resend_verification_handler))
        .route("/auth/forgot-password", post(forgot_password_handler))
        .route("/auth/reset-password", post(reset_password_handler))
        .route("/auth/me", get(me_handler))
        .route("/guest/session", post(guest_session_handler))
        .route("/audio/upload", post(upload_handler))
        .route("/audio/status/{job_id}", get(job_status_handler))
        .route("/audio/download/{job_id}", get(download_handler))
        .route("/user/settings", get(user_settings_handler))
        .route("/user/settings/username", put(update_username_handler))
        .route("/user/settings/password", put(change_password_handler))
        .route("/user/usage", get(usage_stats_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
