use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;
use std::collections::HashSet;

use crate::scheduler::{Quality, ReviewState};
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Persisted scheduling state of one learner-item pair, plus the outcome
/// history the ranker needs for its success rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub learner_id: String,
    pub item_id: String,
    pub state: ReviewState,
    pub next_review_at: Option<DateTime<Utc>>,
    pub last_quality: Option<Quality>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub total_attempts: u32,
    pub total_correct: u32,
    pub updated_at: DateTime<Utc>,
}

impl ReviewRecord {
    /// A never-reviewed pairing with default scheduling state.
    pub fn fresh(learner_id: &str, item_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            learner_id: learner_id.to_string(),
            item_id: item_id.to_string(),
            state: ReviewState::default(),
            next_review_at: None,
            last_quality: None,
            last_reviewed_at: None,
            total_attempts: 0,
            total_correct: 0,
            updated_at: now,
        }
    }

    /// Percentage of correct recalls; no history counts as 0%.
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        f64::from(self.total_correct) / f64::from(self.total_attempts) * 100.0
    }
}

fn due_index_key_for_record(record: &ReviewRecord) -> Result<Option<String>, StoreError> {
    match record.next_review_at {
        Some(next_review_at) => Ok(Some(keys::review_due_index_key(
            &record.learner_id,
            next_review_at.timestamp_millis(),
            &record.item_id,
        )?)),
        None => Ok(None),
    }
}

fn abort_on_decode(
    error: serde_json::Error,
) -> sled::transaction::ConflictableTransactionError<StoreError> {
    sled::transaction::ConflictableTransactionError::Abort(StoreError::Serialization(error))
}

fn unwrap_tx_error(error: sled::transaction::TransactionError<StoreError>) -> StoreError {
    match error {
        sled::transaction::TransactionError::Abort(store_error) => store_error,
        sled::transaction::TransactionError::Storage(storage_error) => {
            StoreError::Sled(storage_error)
        }
    }
}

impl Store {
    pub fn get_review_record(
        &self,
        learner_id: &str,
        item_id: &str,
    ) -> Result<Option<ReviewRecord>, StoreError> {
        let key = keys::review_record_key(learner_id, item_id)?;
        match self.review_records.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Writes the record and moves its due-index entry in one transaction.
    pub fn set_review_record(&self, record: &ReviewRecord) -> Result<(), StoreError> {
        self.update_review_record(&record.learner_id, &record.item_id, |_| record.clone())?;
        Ok(())
    }

    /// Reads the pair's record, applies `update` and writes the result back in
    /// one transaction, so concurrent updates of the same pair serialize.
    /// `update` may run again if the transaction is retried.
    pub fn update_review_record<F>(
        &self,
        learner_id: &str,
        item_id: &str,
        update: F,
    ) -> Result<ReviewRecord, StoreError>
    where
        F: Fn(Option<ReviewRecord>) -> ReviewRecord,
    {
        let key = keys::review_record_key(learner_id, item_id)?;

        (&self.review_records, &self.review_due_index)
            .transaction(|(tx_records, tx_due_index)| {
                let previous: Option<ReviewRecord> = match tx_records.get(key.as_bytes())? {
                    Some(raw) => Some(serde_json::from_slice(&raw).map_err(abort_on_decode)?),
                    None => None,
                };
                let old_due_index_key = match &previous {
                    Some(old) => due_index_key_for_record(old)
                        .map_err(sled::transaction::ConflictableTransactionError::Abort)?,
                    None => None,
                };

                let next = update(previous);
                if next.learner_id != learner_id || next.item_id != item_id {
                    return Err(sled::transaction::ConflictableTransactionError::Abort(
                        StoreError::Validation(
                            "updated review record must keep its learner and item".to_string(),
                        ),
                    ));
                }
                let value = serde_json::to_vec(&next).map_err(abort_on_decode)?;
                let next_due_index_key = due_index_key_for_record(&next)
                    .map_err(sled::transaction::ConflictableTransactionError::Abort)?;

                if let Some(old_key) = old_due_index_key {
                    tx_due_index.remove(old_key.as_bytes())?;
                }
                tx_records.insert(key.as_bytes(), value)?;
                if let Some(due_key) = &next_due_index_key {
                    tx_due_index.insert(due_key.as_bytes(), &[] as &[u8])?;
                }

                Ok(next)
            })
            .map_err(unwrap_tx_error)
    }

    /// Returns `true` when a record existed.
    pub fn delete_review_record(
        &self,
        learner_id: &str,
        item_id: &str,
    ) -> Result<bool, StoreError> {
        let key = keys::review_record_key(learner_id, item_id)?;

        let removed = (&self.review_records, &self.review_due_index)
            .transaction(|(tx_records, tx_due_index)| {
                let Some(raw) = tx_records.remove(key.as_bytes())? else {
                    return Ok(false);
                };
                let removed: ReviewRecord =
                    serde_json::from_slice(&raw).map_err(abort_on_decode)?;
                if let Some(due_key) = due_index_key_for_record(&removed)
                    .map_err(sled::transaction::ConflictableTransactionError::Abort)?
                {
                    tx_due_index.remove(due_key.as_bytes())?;
                }
                Ok(true)
            })
            .map_err(unwrap_tx_error)?;

        Ok(removed)
    }

    /// Records due at or before `now_ms`, earliest due first.
    pub fn get_due_records(
        &self,
        learner_id: &str,
        now_ms: i64,
        limit: usize,
    ) -> Result<Vec<ReviewRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let prefix = keys::review_due_index_prefix(learner_id)?;
        let now_ms = now_ms.max(0);
        let mut due = Vec::new();
        let mut seen_item_ids = HashSet::new();

        for item in self.review_due_index.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            let Some((due_ts_ms, item_id)) = keys::parse_due_index_item_key(&key) else {
                continue;
            };

            if due_ts_ms > now_ms {
                break;
            }

            let Some(record) = self.get_review_record(learner_id, &item_id)? else {
                continue;
            };
            // Skip index entries that no longer match the record's due date.
            let Some(next_review_at) = record.next_review_at else {
                continue;
            };
            if next_review_at.timestamp_millis().max(0) != due_ts_ms {
                continue;
            }
            if seen_item_ids.insert(item_id) {
                due.push(record);
                if due.len() >= limit {
                    break;
                }
            }
        }

        Ok(due)
    }

    pub fn list_learner_records(
        &self,
        learner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReviewRecord>, StoreError> {
        let prefix = keys::review_record_prefix(learner_id)?;
        let mut records = Vec::new();
        for item in self
            .review_records
            .scan_prefix(prefix.as_bytes())
            .skip(offset)
            .take(limit)
        {
            let (_, v) = item?;
            records.push(Self::deserialize::<ReviewRecord>(&v)?);
        }
        Ok(records)
    }

    /// Distinct learners that have at least one review record.
    pub fn list_learner_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut learners: Vec<String> = Vec::new();
        for item in self.review_records.iter() {
            let (key, _) = item?;
            let Some(learner_id) = keys::learner_of_record_key(&key) else {
                tracing::warn!("Skipping malformed review record key");
                continue;
            };
            // keys are sorted, so equal learner prefixes are adjacent
            if learners.last().map(String::as_str) != Some(learner_id) {
                learners.push(learner_id.to_string());
            }
        }
        Ok(learners)
    }
}

#[cfg(test)]
mod tests {
    use super::ReviewRecord;
    use crate::scheduler::ReviewState;
    use crate::store::{Store, StoreError};
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn mock_record(learner_id: &str, item_id: &str, due_in: Option<Duration>) -> ReviewRecord {
        let now = Utc::now();
        ReviewRecord {
            state: ReviewState::new(1, 1, 2.5).unwrap(),
            next_review_at: due_in.map(|d| now + d),
            total_attempts: 4,
            total_correct: 3,
            ..ReviewRecord::fresh(learner_id, item_id, now)
        }
    }

    #[test]
    fn update_sees_previous_record_and_moves_due_entry() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let first = store
            .update_review_record("u1", "w1", |previous| {
                assert!(previous.is_none());
                mock_record("u1", "w1", Some(-Duration::days(2)))
            })
            .unwrap();

        let second = store
            .update_review_record("u1", "w1", |previous| {
                let previous = previous.expect("record from the first update");
                ReviewRecord {
                    total_attempts: previous.total_attempts + 1,
                    next_review_at: Some(Utc::now() + Duration::days(3)),
                    ..previous
                }
            })
            .unwrap();
        assert_eq!(second.total_attempts, first.total_attempts + 1);

        assert!(store.get_due_records("u1", Utc::now().timestamp_millis(), 10).unwrap().is_empty());
        assert_eq!(store.review_due_index.scan_prefix("u1:".as_bytes()).count(), 1);
    }

    #[test]
    fn update_cannot_rekey_a_record() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let result = store.update_review_record("u1", "w1", |_| mock_record("u2", "w1", None));
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert!(store.get_review_record("u1", "w1").unwrap().is_none());
        assert!(store.get_review_record("u2", "w1").unwrap().is_none());
    }

    #[test]
    fn get_returns_what_was_set() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let record = mock_record("u1", "w1", Some(Duration::days(1)));
        store.set_review_record(&record).unwrap();

        let loaded = store.get_review_record("u1", "w1").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(store.get_review_record("u1", "missing").unwrap().is_none());
    }

    #[test]
    fn due_records_are_ascending_and_limited() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db-due").to_str().unwrap()).unwrap();

        store
            .set_review_record(&mock_record("u1", "w1", Some(-Duration::days(5))))
            .unwrap();
        store
            .set_review_record(&mock_record("u1", "w2", Some(-Duration::days(1))))
            .unwrap();
        store
            .set_review_record(&mock_record("u1", "w3", Some(-Duration::days(3))))
            .unwrap();
        store
            .set_review_record(&mock_record("u1", "w4", Some(Duration::days(1))))
            .unwrap();
        store
            .set_review_record(&mock_record("u2", "w5", Some(-Duration::days(9))))
            .unwrap();

        let now_ms = Utc::now().timestamp_millis();
        let due = store.get_due_records("u1", now_ms, 2).unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].item_id, "w1");
        assert_eq!(due[1].item_id, "w3");

        let all_due = store.get_due_records("u1", now_ms, 100).unwrap();
        assert_eq!(all_due.len(), 3);
    }

    #[test]
    fn rescheduling_moves_the_due_index_entry() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db-move").to_str().unwrap()).unwrap();

        let mut record = mock_record("u1", "w1", Some(-Duration::days(2)));
        store.set_review_record(&record).unwrap();
        let now_ms = Utc::now().timestamp_millis();
        assert_eq!(store.get_due_records("u1", now_ms, 10).unwrap().len(), 1);

        record.next_review_at = Some(Utc::now() + Duration::days(6));
        store.set_review_record(&record).unwrap();
        assert!(store.get_due_records("u1", now_ms, 10).unwrap().is_empty());
        assert_eq!(store.review_due_index.len(), 1);
    }

    #[test]
    fn delete_removes_record_and_index() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db-del").to_str().unwrap()).unwrap();

        store
            .set_review_record(&mock_record("u1", "w1", Some(-Duration::hours(1))))
            .unwrap();
        assert!(store.delete_review_record("u1", "w1").unwrap());
        assert!(!store.delete_review_record("u1", "w1").unwrap());
        assert!(store.review_due_index.is_empty());
    }

    #[test]
    fn learner_ids_are_distinct() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db-learners").to_str().unwrap()).unwrap();

        for (learner, item) in [("a", "w1"), ("a", "w2"), ("b", "w1"), ("c", "w3")] {
            store
                .set_review_record(&mock_record(learner, item, None))
                .unwrap();
        }
        assert_eq!(store.list_learner_ids().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(store.list_learner_records("a", 10, 1).unwrap().len(), 1);
    }

    #[test]
    fn success_rate_is_a_percentage() {
        let record = mock_record("u1", "w1", None);
        assert!((record.success_rate() - 75.0).abs() < 1e-9);
        assert_eq!(
            ReviewRecord::fresh("u1", "w1", Utc::now()).success_rate(),
            0.0
        );
    }
}
