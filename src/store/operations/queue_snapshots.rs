use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::ScoredCandidate;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Ranked due queue computed ahead of time by the snapshot worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub learner_id: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<ScoredCandidate>,
}

impl Store {
    pub fn put_queue_snapshot(&self, snapshot: &QueueSnapshot) -> Result<(), StoreError> {
        let key = keys::queue_snapshot_key(&snapshot.learner_id)?;
        self.queue_snapshots
            .insert(key.as_bytes(), Self::serialize(snapshot)?)?;
        Ok(())
    }

    pub fn get_queue_snapshot(
        &self,
        learner_id: &str,
    ) -> Result<Option<QueueSnapshot>, StoreError> {
        let key = keys::queue_snapshot_key(learner_id)?;
        match self.queue_snapshots.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }
}
