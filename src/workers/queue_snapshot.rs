//! Nightly re-ranking of every learner's due queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::services::review_session::{self, QueueLimits};
use crate::store::Store;

/// Clears the sweep flag when the blocking sweep ends, even if the worker
/// timeout already stopped waiting for it.
struct SweepGuard(Arc<AtomicBool>);

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs one sweep unless the previous one is still going. `sweeping` is shared
/// across invocations of the job.
pub async fn run(store: Arc<Store>, limits: QueueLimits, sweeping: Arc<AtomicBool>) {
    if sweeping
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        tracing::warn!("Previous queue snapshot sweep still running; skipping");
        return;
    }
    let guard = SweepGuard(sweeping);

    tracing::info!("Queue snapshot worker running");

    // the sweep touches every learner's records; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        review_session::snapshot_all_queues(&store, Utc::now(), limits)
    })
    .await;

    match result {
        Ok(Ok(written)) => tracing::info!(written, "Queue snapshot worker finished"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Queue snapshot worker failed"),
        Err(e) => tracing::error!(error = %e, "Queue snapshot worker panicked"),
    }
}
