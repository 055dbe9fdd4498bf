mod maintenance_worker;
mod processing_worker;
mod usage_tracker;
mod worker_monitor;

pub use maintenance_worker::MaintenanceWorker;
pub use processing_worker::{ProcessingMessage, ProcessingWorker, ProcessingWorkerError};
pub use usage_tracker::UsageTracker;
pub use worker_monitor::{
    WorkerHealth, WorkerMonitor, AUDIO_PROCESSING_QUEUE, MAINTENANCE_QUEUE,
};
