pub mod queue_snapshot;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::{QueueConfig, WorkerConfig};
use crate::services::review_session::QueueLimits;
use crate::store::Store;

/// Timeout for individual worker invocations (30 minutes).
const WORKER_TIMEOUT: Duration = Duration::from_secs(1_800);

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    QueueSnapshot,
}

impl WorkerName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueueSnapshot => "queue_snapshot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: String,
    pub enabled: bool,
}

pub struct WorkerManager {
    store: Arc<Store>,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
    queue: QueueConfig,
}

impl WorkerManager {
    pub fn new(
        store: Arc<Store>,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
        queue: &QueueConfig,
    ) -> Self {
        Self {
            store,
            shutdown_rx,
            config: config.clone(),
            queue: queue.clone(),
        }
    }

    /// Single source of truth for all planned jobs and their cron schedules.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        vec![JobSpec {
            name: WorkerName::QueueSnapshot,
            cron: self.config.queue_snapshot_cron.clone(),
            enabled: self.config.enable_queue_snapshot,
        }]
    }

    /// Start the worker scheduler and block until shutdown is signalled.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;

        self.register_jobs(&scheduler).await;

        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            "Worker manager shutting down, draining for {}s",
            DRAIN_TIMEOUT.as_secs()
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        for job in self.planned_jobs() {
            let name_str = job.name.as_str();
            if !job.enabled {
                tracing::info!(name = name_str, "Skipping disabled worker");
                continue;
            }

            match job.name {
                WorkerName::QueueSnapshot => {
                    let store = self.store.clone();
                    let limits = QueueLimits {
                        limit: self.queue.max_limit,
                        max_due_scan: self.queue.max_due_scan,
                    };
                    // the timeout below only stops waiting; this flag tracks the sweep itself
                    let sweeping = Arc::new(AtomicBool::new(false));
                    add_job(scheduler, &job.cron, name_str, move || {
                        queue_snapshot::run(store.clone(), limits, sweeping.clone())
                    })
                    .await;
                }
            }
            tracing::info!(name = name_str, cron = %job.cron, "Registered worker");
        }
    }
}

/// Add a job to the scheduler with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(scheduler: &JobScheduler, cron: &str, name: &'static str, mut run: F)
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(
                worker = name,
                "Skipping worker invocation: previous run still in progress"
            );
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            if tokio::time::timeout(WORKER_TIMEOUT, fut).await.is_err() {
                tracing::error!(
                    worker = name,
                    timeout_secs = WORKER_TIMEOUT.as_secs(),
                    "Worker timed out"
                );
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(error = %err, cron, worker = name, "Failed to add worker job");
            }
        }
        Err(err) => {
            tracing::error!(error = %err, cron, worker = name, "Failed to create worker job")
        }
    }
}
