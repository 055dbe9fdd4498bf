use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

pub const AUDIO_PROCESSING_QUEUE: &str = "audio_processing";
pub const MAINTENANCE_QUEUE: &str = "maintenance";

type QueueDepthFn = Box<dyn Fn() -> usize + Send + Sync>;

struct WorkerEntry {
    queue: String,
    last_seen: Instant,
}

/// Heartbeat registry for the background workers. Workers report in on every
/// loop iteration; the health endpoint reads a snapshot. A worker whose last
/// heartbeat is older than `stale_after` no longer counts as available.
pub struct WorkerMonitor {
    stale_after: Duration,
    workers: RwLock<HashMap<String, WorkerEntry>>,
    queue_depths: RwLock<HashMap<String, QueueDepthFn>>,
}

#[derive(Debug, Clone)]
pub struct WorkerHealth {
    pub available: bool,
    pub worker_count: usize,
    pub workers: Vec<String>,
    pub queues: Vec<String>,
    pub queue_depths: HashMap<String, usize>,
    pub error: Option<String>,
}

impl WorkerHealth {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            worker_count: 0,
            workers: Vec::new(),
            queues: Vec::new(),
            queue_depths: HashMap::new(),
            error: Some(reason.into()),
        }
    }
}

impl WorkerMonitor {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            workers: RwLock::new(HashMap::new()),
            queue_depths: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register_worker(&self, name: impl Into<String>, queue: &str) {
        let name = name.into();
        self.workers.write().await.insert(
            name,
            WorkerEntry {
                queue: queue.to_string(),
                last_seen: Instant::now(),
            },
        );
    }

    pub async fn deregister_worker(&self, name: &str) {
        self.workers.write().await.remove(name);
    }

    pub async fn heartbeat(&self, name: &str) {
        if let Some(entry) = self.workers.write().await.get_mut(name) {
            entry.last_seen = Instant::now();
        }
    }

    /// Registers a gauge reporting the number of messages waiting on a queue.
    pub async fn register_queue_depth(
        &self,
        queue: &str,
        depth: impl Fn() -> usize + Send + Sync + 'static,
    ) {
        self.queue_depths
            .write()
            .await
            .insert(queue.to_string(), Box::new(depth));
    }

    pub async fn snapshot(&self) -> WorkerHealth {
        let workers = self.workers.read().await;

        let mut names: Vec<String> = Vec::new();
        let mut queues: Vec<String> = Vec::new();
        for (name, entry) in workers.iter() {
            if entry.last_seen.elapsed() <= self.stale_after {
                names.push(name.clone());
                if !queues.contains(&entry.queue) {
                    queues.push(entry.queue.clone());
                }
            }
        }
        drop(workers);

        names.sort();
        queues.sort();

        let mut depths = HashMap::new();
        for (queue, gauge) in self.queue_depths.read().await.iter() {
            depths.insert(queue.clone(), gauge());
        }

        let available = !names.is_empty();
        WorkerHealth {
            available,
            worker_count: names.len(),
            workers: names,
            queues,
            queue_depths: depths,
            error: if available {
                None
            } else {
                Some("No workers are currently running".to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_reports_registered_workers() {
        let monitor = WorkerMonitor::new(Duration::from_secs(30));
        monitor
            .register_worker("audio-worker-0", AUDIO_PROCESSING_QUEUE)
            .await;
        monitor
            .register_worker("maintenance-worker", MAINTENANCE_QUEUE)
            .await;

        let health = monitor.snapshot().await;
        assert!(health.available);
        assert_eq!(health.worker_count, 2);
        assert_eq!(
            health.queues,
            vec![
                AUDIO_PROCESSING_QUEUE.to_string(),
                MAINTENANCE_QUEUE.to_string()
            ]
        );
        assert!(health.error.is_none());
    }

    #[tokio::test]
    async fn stale_workers_drop_out_of_snapshot() {
        let monitor = WorkerMonitor::new(Duration::from_millis(0));
        monitor
            .register_worker("audio-worker-0", AUDIO_PROCESSING_QUEUE)
            .await;

        tokio::time::sleep(Duration::from_millis(10)).await;

        let health = monitor.snapshot().await;
        assert!(!health.available);
        assert_eq!(health.worker_count, 0);
        assert!(health.error.is_some());
    }

    #[tokio::test]
    async fn queue_depth_gauges_are_read_on_snapshot() {
        let monitor = WorkerMonitor::new(Duration::from_secs(30));
        monitor
            .register_queue_depth(AUDIO_PROCESSING_QUEUE, || 3)
            .await;

        let health = monitor.snapshot().await;
        assert_eq!(
            health.queue_depths.get(AUDIO_PROCESSING_QUEUE).copied(),
            Some(3)
        );
    }

    #[tokio::test]
    async fn deregistered_worker_is_forgotten() {
        let monitor = WorkerMonitor::new(Duration::from_secs(30));
        monitor
            .register_worker("audio-worker-0", AUDIO_PROCESSING_QUEUE)
            .await;
        monitor.deregister_worker("audio-worker-0").await;

        let health = monitor.snapshot().await;
        assert!(!health.available);
    }
}
