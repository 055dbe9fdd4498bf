use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};

use whazz_backend::application::ports::{
    AudioProbe, AudioProcessor, EventPublisher, JobRepository, MediaStore, PasswordHasher,
    TokenBlacklist, TokenIssuer, UserRepository,
};
use whazz_backend::application::services::{
    MaintenanceWorker, ProcessingWorker, UsageTracker, WorkerMonitor, AUDIO_PROCESSING_QUEUE,
};
use whazz_backend::infrastructure::audio::{PeakNormalizer, SymphoniaProbe};
use whazz_backend::infrastructure::auth::{Argon2PasswordHasher, JwtTokenIssuer};
use whazz_backend::infrastructure::events::LogEventPublisher;
use whazz_backend::infrastructure::observability::{init_tracing, TracingConfig};
use whazz_backend::infrastructure::persistence::{
    create_pool, PgJobRepository, PgTokenBlacklist, PgUsageStatsRepository, PgUserRepository,
};
use whazz_backend::infrastructure::storage::LocalMediaStore;
use whazz_backend::presentation::{create_router, AppState, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Arc::new(Settings::from_env().map_err(anyhow::Error::msg)?);
    init_tracing(TracingConfig::default(), settings.server.port);

    let pool = create_pool(&settings.database.url, settings.database.max_connections).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let jobs: Arc<dyn JobRepository> = Arc::new(PgJobRepository::new(pool.clone()));
    let token_blacklist: Arc<dyn TokenBlacklist> = Arc::new(PgTokenBlacklist::new(pool.clone()));
    let usage = Arc::new(UsageTracker::new(Arc::new(PgUsageStatsRepository::new(
        pool.clone(),
    ))));

    let media_store: Arc<dyn MediaStore> =
        Arc::new(LocalMediaStore::new(settings.audio.upload_dir.clone())?);
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new());
    let token_issuer: Arc<dyn TokenIssuer> = Arc::new(JwtTokenIssuer::new(
        SecretString::from(settings.auth.jwt_secret.expose_secret().to_owned()),
        chrono::Duration::minutes(settings.auth.access_token_expire_minutes),
        chrono::Duration::days(settings.auth.refresh_token_expire_days),
    ));
    let audio_probe: Arc<dyn AudioProbe> = Arc::new(SymphoniaProbe);
    let processor: Arc<dyn AudioProcessor> = Arc::new(PeakNormalizer::default());
    let events: Arc<dyn EventPublisher> =
        Arc::new(LogEventPublisher::new(settings.frontend_url.clone()));

    let monitor = Arc::new(WorkerMonitor::new(Duration::from_secs(
        settings.workers.stale_after_secs,
    )));

    let (queue_tx, queue_rx) = mpsc::channel(settings.workers.queue_capacity);
    let gauge_tx = queue_tx.clone();
    monitor
        .register_queue_depth(AUDIO_PROCESSING_QUEUE, move || {
            gauge_tx.max_capacity() - gauge_tx.capacity()
        })
        .await;

    let queue_rx = Arc::new(Mutex::new(queue_rx));
    for i in 0..settings.workers.count {
        let worker = ProcessingWorker::new(
            format!("audio-worker-{}", i),
            Arc::clone(&queue_rx),
            Arc::clone(&jobs),
            Arc::clone(&media_store),
            Arc::clone(&processor),
            Arc::clone(&usage),
            Arc::clone(&monitor),
        );
        tokio::spawn(worker.run());
    }

    let maintenance = MaintenanceWorker::new(
        "maintenance-worker",
        Duration::from_secs(settings.workers.maintenance_interval_secs),
        Arc::clone(&jobs),
        Arc::clone(&media_store),
        Arc::clone(&token_blacklist),
        Arc::clone(&monitor),
    );
    tokio::spawn(maintenance.run());

    let state = AppState {
        users,
        jobs,
        token_blacklist,
        media_store,
        password_hasher,
        token_issuer,
        audio_probe,
        events,
        usage,
        worker_monitor: monitor,
        processing_queue: queue_tx,
        settings: Arc::clone(&settings),
    };

    let router = create_router(state);

    let addr = SocketAddr::new(settings.server.host.parse()?, settings.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
