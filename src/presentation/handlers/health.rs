use std::collections::HashMap;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::application::services::WorkerHealth;
use crate::presentation::state::AppState;

/// Upper bound on worker introspection so the probe can never hang past the
/// orchestrator's request timeout.
const WORKER_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub api: ApiHealth,
    pub workers: WorkersHealth,
}

#[derive(Serialize)]
pub struct ApiHealth {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct WorkersHealth {
    pub status: String,
    pub available: bool,
    pub count: usize,
    pub queues: Vec<String>,
    pub queue_depths: HashMap<String, usize>,
    pub warning: Option<String>,
}

impl From<WorkerHealth> for WorkersHealth {
    fn from(health: WorkerHealth) -> Self {
        Self {
            status: if health.available {
                "operational".to_string()
            } else {
                "unavailable".to_string()
            },
            available: health.available,
            count: health.worker_count,
            queues: if health.available {
                health.queues
            } else {
                Vec::new()
            },
            queue_depths: health.queue_depths,
            warning: health.error,
        }
    }
}

/// Liveness probe. Worker degradation is reported in-band; the endpoint
/// itself always answers 200 while the API is up.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let workers =
        match tokio::time::timeout(WORKER_CHECK_TIMEOUT, state.worker_monitor.snapshot()).await {
            Ok(snapshot) => snapshot,
            Err(_) => WorkerHealth::unavailable("Worker registry check timed out"),
        };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: state.settings.app_name.clone(),
            api: ApiHealth {
                status: "operational".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            workers: workers.into(),
        }),
    )
}

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub health: String,
}

pub async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(RootResponse {
            message: format!("Welcome to {}", state.settings.app_name),
            version: env!("CARGO_PKG_VERSION").to_string(),
            health: "/health".to_string(),
        }),
    )
}
