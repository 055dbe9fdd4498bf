use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::ports::{
    AudioProbe, EventPublisher, JobRepository, MediaStore, PasswordHasher, TokenBlacklist,
    TokenIssuer, UserRepository,
};
use crate::application::services::{ProcessingMessage, UsageTracker, WorkerMonitor};
use crate::presentation::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub token_blacklist: Arc<dyn TokenBlacklist>,
    pub media_store: Arc<dyn MediaStore>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub token_issuer: Arc<dyn TokenIssuer>,
    pub audio_probe: Arc<dyn AudioProbe>,
    pub events: Arc<dyn EventPublisher>,
    pub usage: Arc<UsageTracker>,
    pub worker_monitor: Arc<WorkerMonitor>,
    pub processing_queue: mpsc::Sender<ProcessingMessage>,
    pub settings: Arc<Settings>,
}
