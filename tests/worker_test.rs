mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use futures::StreamExt;
use tower::ServiceExt;

use whazz_backend::application::services::{MaintenanceWorker, ProcessingWorker};
use whazz_backend::domain::{
    AudioFormat, AudioJob, AudioProperties, GuestId, JobOwner, JobStatus, StoragePath,
};

use common::{create_test_app, request, sample_wav, test_processor, upload, TestApp};

fn spawn_worker(app: &mut TestApp) {
    let receiver = Arc::new(tokio::sync::Mutex::new(std::mem::replace(
        &mut app.queue_rx,
        tokio::sync::mpsc::channel(1).1,
    )));
    let worker = ProcessingWorker::new(
        "audio-worker-0",
        receiver,
        Arc::clone(&app.state.jobs),
        Arc::clone(&app.state.media_store),
        test_processor(),
        Arc::clone(&app.state.usage),
        Arc::clone(&app.state.worker_monitor),
    );
    tokio::spawn(worker.run());
}

async fn wait_for_terminal_status(
    app: &TestApp,
    job_id: &str,
    guest_id: &str,
) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let (_, body) = request(
            &app.router,
            "GET",
            &format!("/audio/status/{}", job_id),
            None,
            &[("x-guest-id", guest_id)],
        )
        .await;

        match body["status"].as_str() {
            Some("completed") | Some("failed") => return body,
            _ if tokio::time::Instant::now() > deadline => {
                panic!("job did not reach a terminal state: {:?}", body);
            }
            _ => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
}

#[tokio::test]
async fn given_enqueued_wav_when_worker_runs_then_job_completes() {
    let mut app = create_test_app();

    let (status, body) = upload(&app.router, "take.wav", &sample_wav(), &[]).await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let guest_id = body["guest_id"].as_str().unwrap().to_string();

    spawn_worker(&mut app);

    let body = wait_for_terminal_status(&app, &job_id, &guest_id).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["progress"], 1.0);
    assert_eq!(body["output_available"], true);
    assert!(body["started_at"].is_string());
    assert!(body["completed_at"].is_string());

    // Input and output objects both live in the store.
    assert_eq!(app.media_store.object_count(), 2);
}

#[tokio::test]
async fn given_completed_job_when_download_then_returns_wav_attachment() {
    let mut app = create_test_app();

    let (_, body) = upload(&app.router, "voice memo.wav", &sample_wav(), &[]).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let guest_id = body["guest_id"].as_str().unwrap().to_string();

    spawn_worker(&mut app);
    wait_for_terminal_status(&app, &job_id, &guest_id).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/audio/download/{}", job_id))
                .header("x-guest-id", guest_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "audio/wav");
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.contains("voice memo_updated.wav"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
}

#[tokio::test]
async fn given_undecodable_upload_when_worker_runs_then_job_fails_with_error() {
    let mut app = create_test_app();

    // Passes the extension allow-list but is not a readable container.
    let (status, body) = upload(&app.router, "broken.wav", b"not really audio", &[]).await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let guest_id = body["guest_id"].as_str().unwrap().to_string();

    spawn_worker(&mut app);

    let body = wait_for_terminal_status(&app, &job_id, &guest_id).await;
    assert_eq!(body["status"], "failed");
    assert!(body["error_message"].is_string());
    assert_eq!(body["output_available"], false);
}

#[tokio::test]
async fn given_expired_job_when_maintenance_sweeps_then_objects_deleted_and_job_expired() {
    let app = create_test_app();

    // A completed job whose expiry deadline already passed.
    let job = AudioJob::new(
        "old.wav".to_string(),
        64,
        AudioFormat::Wav,
        AudioProperties::default(),
        JobOwner::Guest(GuestId::new()),
        chrono::Duration::hours(-1),
    );
    let input_path = job.input_path.clone();
    let output_path = StoragePath::output(&job.id);

    let payload = sample_wav();
    for path in [&input_path, &output_path] {
        let data = bytes::Bytes::from(payload.clone());
        let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(data) }).boxed();
        app.state.media_store.store(path, stream).await.unwrap();
    }
    app.state.jobs.create(&job).await.unwrap();
    app.state.jobs.mark_completed(job.id, &output_path).await.unwrap();

    // An already-expired blacklist entry alongside a live one.
    app.state
        .token_blacklist
        .insert("stale-token", Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();
    app.state
        .token_blacklist
        .insert("live-token", Utc::now() + chrono::Duration::hours(1))
        .await
        .unwrap();

    let maintenance = MaintenanceWorker::new(
        "maintenance-worker",
        Duration::from_secs(900),
        Arc::clone(&app.state.jobs),
        Arc::clone(&app.state.media_store),
        Arc::clone(&app.state.token_blacklist),
        Arc::clone(&app.state.worker_monitor),
    );
    maintenance.sweep().await.unwrap();

    assert_eq!(app.media_store.object_count(), 0);
    let swept = app.state.jobs.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(swept.status, JobStatus::Expired);

    assert!(!app.state.token_blacklist.contains("stale-token").await.unwrap());
    assert!(app.state.token_blacklist.contains("live-token").await.unwrap());
}
