use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::domain::GuestId;
use crate::presentation::extract::GUEST_ID_HEADER;

#[derive(Serialize)]
pub struct GuestSessionResponse {
    pub guest_id: String,
    pub header: String,
}

/// Mints a guest identity for anonymous uploads. The client sends it back in
/// the `X-Guest-ID` header on subsequent status and download calls.
#[tracing::instrument]
pub async fn guest_session_handler() -> impl IntoResponse {
    let guest_id = GuestId::new();
    tracing::debug!(guest_id = %guest_id, "Guest session created");

    (
        StatusCode::CREATED,
        Json(GuestSessionResponse {
            guest_id: guest_id.to_string(),
            header: GUEST_ID_HEADER.to_string(),
        }),
    )
}
