mod common;

use axum::http::StatusCode;
use serde_json::json;

use whazz_backend::application::services::AUDIO_PROCESSING_QUEUE;

use common::{create_test_app, request, sample_wav, signup_and_login, upload};

#[tokio::test]
async fn given_running_server_when_health_check_then_returns_ok() {
    let app = create_test_app();

    let (status, body) = request(&app.router, "GET", "/health", None, &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["api"]["status"], "operational");
}

#[tokio::test]
async fn given_no_workers_when_health_check_then_workers_unavailable_with_warning() {
    let app = create_test_app();

    let (_, body) = request(&app.router, "GET", "/health", None, &[]).await;

    assert_eq!(body["workers"]["status"], "unavailable");
    assert_eq!(body["workers"]["available"], false);
    assert_eq!(body["workers"]["count"], 0);
    assert!(body["workers"]["warning"].is_string());
}

#[tokio::test]
async fn given_heartbeating_worker_when_health_check_then_workers_operational() {
    let app = create_test_app();
    app.state
        .worker_monitor
        .register_worker("audio-worker-0", AUDIO_PROCESSING_QUEUE)
        .await;

    let (_, body) = request(&app.router, "GET", "/health", None, &[]).await;

    assert_eq!(body["workers"]["status"], "operational");
    assert_eq!(body["workers"]["count"], 1);
    assert_eq!(body["workers"]["queues"][0], AUDIO_PROCESSING_QUEUE);
    assert!(body["workers"]["warning"].is_null());
}

#[tokio::test]
async fn given_root_request_when_get_then_returns_service_info() {
    let app = create_test_app();

    let (status, body) = request(&app.router, "GET", "/", None, &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Whazz Audio API");
}

#[tokio::test]
async fn given_request_without_id_when_any_endpoint_then_response_contains_request_id() {
    let app = create_test_app();

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        axum::http::Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn given_request_with_id_when_any_endpoint_then_response_echoes_request_id() {
    let app = create_test_app();

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        axum::http::Request::builder()
            .uri("/health")
            .header("x-request-id", "test-request-123")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "test-request-123"
    );
}

#[tokio::test]
async fn given_valid_signup_when_posted_then_returns_created_user() {
    let app = create_test_app();

    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/signup",
        Some(json!({
            "email": "alice@example.com",
            "username": "alice",
            "password": "password123",
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["is_verified"], false);
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn given_duplicate_email_when_signup_then_returns_bad_request() {
    let app = create_test_app();
    signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/signup",
        Some(json!({
            "email": "alice@example.com",
            "username": "alice2",
            "password": "password123",
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn given_duplicate_username_when_signup_then_returns_bad_request() {
    let app = create_test_app();
    signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/signup",
        Some(json!({
            "email": "alice2@example.com",
            "username": "alice",
            "password": "password123",
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already taken");
}

#[tokio::test]
async fn given_short_password_when_signup_then_returns_bad_request() {
    let app = create_test_app();

    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/signup",
        Some(json!({
            "email": "alice@example.com",
            "username": "alice",
            "password": "short",
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_invalid_email_when_signup_then_returns_bad_request() {
    let app = create_test_app();

    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/signup",
        Some(json!({
            "email": "not-an-email",
            "username": "alice",
            "password": "password123",
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_registered_user_when_login_with_email_then_returns_token_pair() {
    let app = create_test_app();
    signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/login",
        Some(json!({
            "username_or_email": "alice@example.com",
            "password": "password123",
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
}

#[tokio::test]
async fn given_wrong_password_when_login_then_returns_unauthorized() {
    let app = create_test_app();
    signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        axum::http::Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({
                    "username_or_email": "alice",
                    "password": "wrong-password",
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("www-authenticate").unwrap(), "Bearer");
}

#[tokio::test]
async fn given_unknown_account_when_login_then_returns_unauthorized() {
    let app = create_test_app();

    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/login",
        Some(json!({
            "username_or_email": "ghost",
            "password": "password123",
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn given_no_token_when_me_then_returns_unauthorized() {
    let app = create_test_app();

    let (status, _) = request(&app.router, "GET", "/auth/me", None, &[]).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn given_valid_token_when_me_then_returns_current_user() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, body) = request(
        &app.router,
        "GET",
        "/auth/me",
        None,
        &[("authorization", &format!("Bearer {}", token))],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn given_logged_out_token_when_me_then_returns_unauthorized() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;
    let auth = format!("Bearer {}", token);

    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/logout",
        None,
        &[("authorization", &auth)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app.router,
        "GET",
        "/auth/me",
        None,
        &[("authorization", &auth)],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn given_already_logged_out_token_when_logout_again_then_returns_bad_request() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;
    let auth = format!("Bearer {}", token);

    request(
        &app.router,
        "POST",
        "/auth/logout",
        None,
        &[("authorization", &auth)],
    )
    .await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/logout",
        None,
        &[("authorization", &auth)],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Token already invalidated");
}

#[tokio::test]
async fn given_refresh_token_when_refresh_then_returns_new_pair() {
    let app = create_test_app();
    signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (_, login_body) = request(
        &app.router,
        "POST",
        "/auth/login",
        Some(json!({
            "username_or_email": "alice",
            "password": "password123",
        })),
        &[],
    )
    .await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/refresh",
        Some(json!({ "refresh_token": login_body["refresh_token"] })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
}

#[tokio::test]
async fn given_access_token_when_refresh_then_returns_unauthorized() {
    let app = create_test_app();
    let access_token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/refresh",
        Some(json!({ "refresh_token": access_token })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token type");
}

#[tokio::test]
async fn given_verification_token_when_verify_email_then_account_is_verified() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let verification_token = app.events.last_verification_token().expect("event token");

    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/verify-email",
        Some(json!({ "token": verification_token })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(
        &app.router,
        "GET",
        "/auth/me",
        None,
        &[("authorization", &format!("Bearer {}", token))],
    )
    .await;
    assert_eq!(body["is_verified"], true);
}

#[tokio::test]
async fn given_unknown_verification_token_when_verify_email_then_returns_bad_request() {
    let app = create_test_app();

    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/verify-email",
        Some(json!({ "token": "bogus" })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid verification token");
}

#[tokio::test]
async fn given_unknown_email_when_forgot_password_then_same_success_message() {
    let app = create_test_app();
    signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (_, known) = request(
        &app.router,
        "POST",
        "/auth/forgot-password",
        Some(json!({ "email": "alice@example.com" })),
        &[],
    )
    .await;
    let (_, unknown) = request(
        &app.router,
        "POST",
        "/auth/forgot-password",
        Some(json!({ "email": "ghost@example.com" })),
        &[],
    )
    .await;

    assert_eq!(known["message"], unknown["message"]);
}

#[tokio::test]
async fn given_reset_token_when_reset_password_then_new_password_works() {
    let app = create_test_app();
    signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    request(
        &app.router,
        "POST",
        "/auth/forgot-password",
        Some(json!({ "email": "alice@example.com" })),
        &[],
    )
    .await;

    let reset_token = app.events.last_reset_token().expect("reset token");

    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/reset-password",
        Some(json!({ "token": reset_token, "new_password": "new-password-456" })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/login",
        Some(json!({ "username_or_email": "alice", "password": "new-password-456" })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/login",
        Some(json!({ "username_or_email": "alice", "password": "password123" })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn given_guest_session_request_when_posted_then_returns_guest_id() {
    let app = create_test_app();

    let (status, body) = request(&app.router, "POST", "/guest/session", None, &[]).await;

    assert_eq!(status, StatusCode::CREATED);
    let guest_id = body["guest_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(guest_id).is_ok());
}

#[tokio::test]
async fn given_empty_body_when_upload_then_returns_bad_request() {
    let app = create_test_app();

    let (status, _) = upload(&app.router, "", &[], &[]).await;
    // An empty multipart part has no usable filename.
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_unsupported_extension_when_upload_then_returns_bad_request() {
    let app = create_test_app();

    let (status, body) = upload(&app.router, "notes.txt", b"hello", &[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Unsupported file format"));
}

#[tokio::test]
async fn given_oversized_file_when_upload_then_returns_payload_too_large() {
    let app = create_test_app();

    // Limit in tests is 1 MB.
    let big = vec![0u8; 1_300_000];
    let (status, _) = upload(&app.router, "big.wav", &big, &[]).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn given_anonymous_wav_upload_then_job_created_with_guest_identity() {
    let mut app = create_test_app();

    let (status, body) = upload(&app.router, "take.wav", &sample_wav(), &[]).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["file_format"], "wav");
    assert_eq!(body["sample_rate"], 8000);
    assert_eq!(body["channels"], 1);
    assert!(body["guest_id"].is_string());
    assert!(body["user_id"].is_null());

    // The input object is staged and the job enqueued.
    assert_eq!(app.media_store.object_count(), 1);
    assert!(app.queue_rx.try_recv().is_ok());
}

#[tokio::test]
async fn given_unknown_job_when_status_then_returns_not_found() {
    let app = create_test_app();
    let guest = uuid::Uuid::new_v4().to_string();

    let (status, _) = request(
        &app.router,
        "GET",
        &format!("/audio/status/{}", uuid::Uuid::new_v4()),
        None,
        &[("x-guest-id", guest.as_str())],
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_malformed_job_id_when_status_then_returns_bad_request() {
    let app = create_test_app();
    let guest = uuid::Uuid::new_v4().to_string();

    let (status, _) = request(
        &app.router,
        "GET",
        "/audio/status/not-a-uuid",
        None,
        &[("x-guest-id", guest.as_str())],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_foreign_guest_when_status_then_returns_forbidden() {
    let app = create_test_app();

    let (_, body) = upload(&app.router, "take.wav", &sample_wav(), &[]).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let other_guest = uuid::Uuid::new_v4().to_string();
    let (status, _) = request(
        &app.router,
        "GET",
        &format!("/audio/status/{}", job_id),
        None,
        &[("x-guest-id", other_guest.as_str())],
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn given_owning_guest_when_status_then_returns_job_state() {
    let app = create_test_app();

    let (_, body) = upload(&app.router, "take.wav", &sample_wav(), &[]).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let guest_id = body["guest_id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app.router,
        "GET",
        &format!("/audio/status/{}", job_id),
        None,
        &[("x-guest-id", guest_id.as_str())],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["progress"], 0.0);
    assert_eq!(body["output_available"], false);
    assert_eq!(body["processing_type"], "speech_enhancement");
}

#[tokio::test]
async fn given_pending_job_when_download_then_returns_bad_request() {
    let app = create_test_app();

    let (_, body) = upload(&app.router, "take.wav", &sample_wav(), &[]).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let guest_id = body["guest_id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app.router,
        "GET",
        &format!("/audio/download/{}", job_id),
        None,
        &[("x-guest-id", guest_id.as_str())],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Job is not completed yet"));
}

#[tokio::test]
async fn given_authenticated_user_when_upload_then_job_owned_by_user() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;
    let auth = format!("Bearer {}", token);

    let (status, body) = upload(
        &app.router,
        "take.wav",
        &sample_wav(),
        &[("authorization", auth.as_str())],
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["user_id"].is_string());
    assert!(body["guest_id"].is_null());

    // The owning user can poll without a guest header.
    let job_id = body["job_id"].as_str().unwrap();
    let (status, _) = request(
        &app.router,
        "GET",
        &format!("/audio/status/{}", job_id),
        None,
        &[("authorization", auth.as_str())],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn given_authenticated_user_when_get_settings_then_returns_profile() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, body) = request(
        &app.router,
        "GET",
        "/user/settings",
        None,
        &[("authorization", &format!("Bearer {}", token))],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn given_taken_username_when_update_username_then_returns_bad_request() {
    let app = create_test_app();
    signup_and_login(&app, "bob@example.com", "bob2bob", "password123").await;
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, body) = request(
        &app.router,
        "PUT",
        "/user/settings/username",
        Some(json!({ "new_username": "bob2bob" })),
        &[("authorization", &format!("Bearer {}", token))],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already taken");
}

#[tokio::test]
async fn given_new_username_when_update_username_then_profile_reflects_it() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;
    let auth = format!("Bearer {}", token);

    let (status, _) = request(
        &app.router,
        "PUT",
        "/user/settings/username",
        Some(json!({ "new_username": "alice_remixed" })),
        &[("authorization", auth.as_str())],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(
        &app.router,
        "GET",
        "/auth/me",
        None,
        &[("authorization", auth.as_str())],
    )
    .await;
    assert_eq!(body["username"], "alice_remixed");
}

#[tokio::test]
async fn given_wrong_current_password_when_change_password_then_returns_unauthorized() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, _) = request(
        &app.router,
        "PUT",
        "/user/settings/password",
        Some(json!({
            "current_password": "wrong-password",
            "new_password": "another-password",
        })),
        &[("authorization", &format!("Bearer {}", token))],
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn given_valid_change_when_change_password_then_login_uses_new_password() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, _) = request(
        &app.router,
        "PUT",
        "/user/settings/password",
        Some(json!({
            "current_password": "password123",
            "new_password": "another-password",
        })),
        &[("authorization", &format!("Bearer {}", token))],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/login",
        Some(json!({ "username_or_email": "alice", "password": "another-password" })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn given_fresh_user_when_usage_stats_then_returns_zeroed_payload() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;

    let (status, body) = request(
        &app.router,
        "GET",
        "/user/usage",
        None,
        &[("authorization", &format!("Bearer {}", token))],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_files_uploaded"], 0);
    assert_eq!(body["total_input_size_mb"], 0.0);
    assert!(body["first_upload_at"].is_null());
}

#[tokio::test]
async fn given_user_upload_when_usage_stats_then_upload_is_counted() {
    let app = create_test_app();
    let token = signup_and_login(&app, "alice@example.com", "alice", "password123").await;
    let auth = format!("Bearer {}", token);

    upload(
        &app.router,
        "take.wav",
        &sample_wav(),
        &[("authorization", auth.as_str())],
    )
    .await;

    let (_, body) = request(
        &app.router,
        "GET",
        "/user/usage",
        None,
        &[("authorization", auth.as_str())],
    )
    .await;

    assert_eq!(body["total_files_uploaded"], 1);
    assert_eq!(body["processing_types_count"]["speech_enhancement"], 1);
    assert!(body["last_upload_at"].is_string());
}
