#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use tokio::sync::mpsc;
use tower::ServiceExt;

use whazz_backend::application::ports::{
    AudioProbe, AudioProcessor, EventPublisher, JobRepository, MediaStore, PasswordHasher,
    TokenBlacklist, TokenIssuer, UserRepository,
};
use whazz_backend::application::services::{ProcessingMessage, UsageTracker, WorkerMonitor};
use whazz_backend::domain::UserEvent;
use whazz_backend::infrastructure::audio::{encode_wav_pcm16, PeakNormalizer, SymphoniaProbe};
use whazz_backend::infrastructure::auth::{Argon2PasswordHasher, JwtTokenIssuer};
use whazz_backend::infrastructure::persistence::{
    InMemoryJobRepository, InMemoryTokenBlacklist, InMemoryUsageStatsRepository,
    InMemoryUserRepository,
};
use whazz_backend::infrastructure::storage::InMemoryMediaStore;
use whazz_backend::presentation::config::{
    AudioSettings, AuthSettings, DatabaseSettings, ServerSettings, Settings, WorkerSettings,
};
use whazz_backend::presentation::{create_router, AppState};

pub const TEST_MAX_FILE_SIZE_MB: u64 = 1;

/// Event publisher that records instead of logging, so tests can pull the
/// one-time tokens out of the published events.
#[derive(Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<UserEvent>>>,
}

impl RecordingEventPublisher {
    pub fn recorded(&self) -> Vec<UserEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_verification_token(&self) -> Option<String> {
        self.recorded().iter().rev().find_map(|e| match e {
            UserEvent::Registered {
                verification_token, ..
            } => Some(verification_token.clone()),
            _ => None,
        })
    }

    pub fn last_reset_token(&self) -> Option<String> {
        self.recorded().iter().rev().find_map(|e| match e {
            UserEvent::PasswordResetRequested { reset_token, .. } => Some(reset_token.clone()),
            _ => None,
        })
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(&self, event: UserEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn test_settings() -> Settings {
    Settings {
        app_name: "Whazz Audio API".to_string(),
        frontend_url: "http://localhost:3000".to_string(),
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8000,
        },
        database: DatabaseSettings {
            url: "postgres://unused".to_string(),
            max_connections: 1,
        },
        auth: AuthSettings {
            jwt_secret: SecretString::from("integration-test-secret".to_string()),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
            verification_token_expire_hours: 24,
            password_reset_token_expire_hours: 2,
        },
        audio: AudioSettings {
            upload_dir: PathBuf::from("./uploads"),
            max_file_size_mb: TEST_MAX_FILE_SIZE_MB,
            file_expiry_hours: 24,
        },
        workers: WorkerSettings {
            count: 1,
            queue_capacity: 8,
            maintenance_interval_secs: 900,
            stale_after_secs: 30,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub events: RecordingEventPublisher,
    pub media_store: Arc<InMemoryMediaStore>,
    pub queue_rx: mpsc::Receiver<ProcessingMessage>,
}

pub fn create_test_app() -> TestApp {
    let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let jobs: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let token_blacklist: Arc<dyn TokenBlacklist> = Arc::new(InMemoryTokenBlacklist::new());
    let usage = Arc::new(UsageTracker::new(Arc::new(
        InMemoryUsageStatsRepository::new(),
    )));

    let media_store = Arc::new(InMemoryMediaStore::new());
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new());
    let settings = Arc::new(test_settings());
    let token_issuer: Arc<dyn TokenIssuer> = Arc::new(JwtTokenIssuer::new(
        SecretString::from("integration-test-secret".to_string()),
        chrono::Duration::minutes(30),
        chrono::Duration::days(7),
    ));
    let audio_probe: Arc<dyn AudioProbe> = Arc::new(SymphoniaProbe);
    let events = RecordingEventPublisher::default();
    let monitor = Arc::new(WorkerMonitor::new(Duration::from_secs(30)));

    let (queue_tx, queue_rx) = mpsc::channel(8);

    let state = AppState {
        users,
        jobs,
        token_blacklist,
        media_store: Arc::clone(&media_store) as Arc<dyn MediaStore>,
        password_hasher,
        token_issuer,
        audio_probe,
        events: Arc::new(events.clone()),
        usage,
        worker_monitor: monitor,
        processing_queue: queue_tx,
        settings,
    };

    TestApp {
        router: create_router(state.clone()),
        state,
        events,
        media_store,
        queue_rx,
    }
}

pub fn test_processor() -> Arc<dyn AudioProcessor> {
    Arc::new(PeakNormalizer::default())
}

/// One-call request helper: send a method/uri with optional JSON body and
/// extra headers, get back the status and parsed JSON body.
pub async fn request(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub const MULTIPART_BOUNDARY: &str = "whazz-test-boundary";

pub fn multipart_upload(filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            MULTIPART_BOUNDARY, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    (
        format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        body,
    )
}

pub async fn upload(
    router: &Router,
    filename: &str,
    data: &[u8],
    headers: &[(&str, &str)],
) -> (StatusCode, serde_json::Value) {
    let (content_type, body) = multipart_upload(filename, data);
    let mut builder = Request::builder()
        .method("POST")
        .uri("/audio/upload")
        .header("content-type", content_type);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let response = router
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn sample_wav() -> Vec<u8> {
    let samples: Vec<f32> = (0..8_000)
        .map(|i| 0.4 * (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 8_000.0).sin())
        .collect();
    encode_wav_pcm16(&samples, 8_000, 1)
}

pub async fn signup_and_login(app: &TestApp, email: &str, username: &str, password: &str) -> String {
    let (status, _) = request(
        &app.router,
        "POST",
        "/auth/signup",
        Some(serde_json::json!({
            "email": email,
            "username": username,
            "password": password,
        })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/login",
        Some(serde_json::json!({
            "username_or_email": username,
            "password": password,
        })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}
