//! Review session orchestration: loads scheduling state from the store, runs
//! it through the pure scheduler and writes the result back.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_SCHEDULE_DAYS;
use crate::scheduler::{
    advance_review_state, self_rating_to_quality, top_k, Quality, QueueCandidate,
    ScoredCandidate, SelfRating,
};
use crate::store::operations::queue_snapshots::QueueSnapshot;
use crate::store::operations::review_items::{ReviewItem, DEFAULT_DIFFICULTY_SCORE};
use crate::store::operations::review_records::ReviewRecord;
use crate::store::{Store, StoreError};

/// What the learner reported for one review: either a raw quality or the
/// self-rating buttons plus whether the answer was right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewOutcome {
    Quality {
        quality: Quality,
    },
    #[serde(rename_all = "camelCase")]
    SelfRated {
        rating: String,
        was_correct: bool,
    },
}

impl ReviewOutcome {
    pub fn quality(&self) -> Quality {
        match self {
            Self::Quality { quality } => *quality,
            Self::SelfRated {
                rating,
                was_correct,
            } => self_rating_to_quality(SelfRating::from_label_lenient(rating), *was_correct),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueueLimits {
    pub limit: usize,
    pub max_due_scan: usize,
}

fn next_review_at(now: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
    let days = i64::from(interval_days.min(MAX_SCHEDULE_DAYS));
    now + Duration::days(days)
}

pub fn record_outcome(
    store: &Store,
    learner_id: &str,
    item_id: &str,
    outcome: &ReviewOutcome,
    now: DateTime<Utc>,
) -> Result<ReviewRecord, StoreError> {
    let quality = outcome.quality();
    let record = store.update_review_record(learner_id, item_id, |previous| {
        let mut record =
            previous.unwrap_or_else(|| ReviewRecord::fresh(learner_id, item_id, now));
        record.state = advance_review_state(quality, &record.state);
        record.next_review_at = Some(next_review_at(now, record.state.interval_days()));
        record.last_quality = Some(quality);
        record.last_reviewed_at = Some(now);
        record.total_attempts = record.total_attempts.saturating_add(1);
        if quality.is_success() {
            record.total_correct = record.total_correct.saturating_add(1);
        }
        record.updated_at = now;
        record
    })?;

    tracing::debug!(
        learner_id,
        item_id,
        quality = quality.get(),
        repetitions = record.state.repetitions(),
        interval_days = record.state.interval_days(),
        ease_factor = record.state.ease_factor(),
        "Recorded review outcome"
    );

    Ok(record)
}

fn to_candidate(
    record: &ReviewRecord,
    difficulty: f64,
    now: DateTime<Utc>,
) -> Option<QueueCandidate> {
    let due_at = record.next_review_at?;
    let days_overdue = (now - due_at).num_days();
    match QueueCandidate::new(
        record.item_id.clone(),
        days_overdue,
        record.success_rate(),
        difficulty,
    ) {
        Ok(candidate) => Some(candidate),
        Err(e) => {
            tracing::warn!(
                learner_id = %record.learner_id,
                item_id = %record.item_id,
                error = %e,
                "Skipping review record with out-of-range ranking inputs"
            );
            None
        }
    }
}

/// Ranked due queue for one learner, highest priority first.
pub fn build_queue(
    store: &Store,
    learner_id: &str,
    now: DateTime<Utc>,
    limits: QueueLimits,
) -> Result<Vec<ScoredCandidate>, StoreError> {
    let due = store.get_due_records(learner_id, now.timestamp_millis(), limits.max_due_scan)?;
    if due.len() >= limits.max_due_scan {
        tracing::warn!(
            learner_id,
            max_due_scan = limits.max_due_scan,
            "Due scan cap reached; queue ranks only the earliest-due records"
        );
    }

    let item_ids: Vec<String> = due.iter().map(|r| r.item_id.clone()).collect();
    let difficulty_by_item = store.get_difficulty_scores(&item_ids)?;

    let candidates: Vec<QueueCandidate> = due
        .iter()
        .filter_map(|record| {
            let difficulty = difficulty_by_item
                .get(&record.item_id)
                .copied()
                .unwrap_or(DEFAULT_DIFFICULTY_SCORE);
            to_candidate(record, difficulty, now)
        })
        .collect();

    Ok(top_k(candidates, limits.limit))
}

/// Forgets a learner-item pairing; the next outcome starts from defaults.
pub fn reset_item(store: &Store, learner_id: &str, item_id: &str) -> Result<bool, StoreError> {
    let removed = store.delete_review_record(learner_id, item_id)?;
    if removed {
        tracing::info!(learner_id, item_id, "Review state reset");
    }
    Ok(removed)
}

pub fn set_item_difficulty(
    store: &Store,
    item_id: &str,
    difficulty_score: f64,
    now: DateTime<Utc>,
) -> Result<ReviewItem, StoreError> {
    let item = ReviewItem {
        item_id: item_id.to_string(),
        difficulty_score,
        updated_at: now,
    };
    store.upsert_review_item(&item)?;
    Ok(item)
}

/// Recomputes and stores every learner's ranked queue. Learners whose queue
/// fails to build are logged and skipped. Returns how many snapshots were
/// written.
pub fn snapshot_all_queues(
    store: &Store,
    now: DateTime<Utc>,
    limits: QueueLimits,
) -> Result<usize, StoreError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let mut written = 0usize;

    for learner_id in store.list_learner_ids()? {
        let entries = match build_queue(store, &learner_id, now, limits) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(learner_id = %learner_id, error = %e, "Queue snapshot failed");
                continue;
            }
        };
        let snapshot = QueueSnapshot {
            learner_id,
            run_id: run_id.clone(),
            generated_at: now,
            entries,
        };
        if let Err(e) = store.put_queue_snapshot(&snapshot) {
            tracing::warn!(
                learner_id = %snapshot.learner_id,
                error = %e,
                "Failed to store queue snapshot"
            );
            continue;
        }
        written += 1;
    }

    tracing::info!(run_id = %run_id, written, "Queue snapshots refreshed");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_store(name: &str) -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join(name).to_str().unwrap()).unwrap();
        (dir, store)
    }

    fn quality(value: u8) -> ReviewOutcome {
        ReviewOutcome::Quality {
            quality: Quality::new(value).unwrap(),
        }
    }

    fn limits(limit: usize) -> QueueLimits {
        QueueLimits {
            limit,
            max_due_scan: 1_000,
        }
    }

    #[test]
    fn outcome_json_accepts_both_shapes() {
        let raw: ReviewOutcome = serde_json::from_str(r#"{"quality": 4}"#).unwrap();
        assert_eq!(raw.quality().get(), 4);

        let rated: ReviewOutcome =
            serde_json::from_str(r#"{"rating": "easy", "wasCorrect": true}"#).unwrap();
        assert_eq!(rated.quality().get(), 5);

        let wrong: ReviewOutcome =
            serde_json::from_str(r#"{"rating": "easy", "wasCorrect": false}"#).unwrap();
        assert_eq!(wrong.quality().get(), 0);

        assert!(serde_json::from_str::<ReviewOutcome>(r#"{"quality": 9}"#).is_err());
    }

    #[test]
    fn concurrent_outcomes_for_one_pair_are_all_applied() {
        let (_dir, store) = open_store("concurrent");
        let now = Utc::now();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        record_outcome(&store, "u1", "w1", &quality(4), now).unwrap();
                    }
                });
            }
        });

        let stored = store.get_review_record("u1", "w1").unwrap().unwrap();
        assert_eq!(stored.total_attempts, 400);
        assert_eq!(stored.total_correct, 400);
        assert_eq!(stored.state.repetitions(), 400);

        let due_entries = store
            .review_due_index
            .scan_prefix("u1:".as_bytes())
            .count();
        assert_eq!(due_entries, 1);
    }

    #[test]
    fn first_outcome_creates_record_due_tomorrow() {
        let (_dir, store) = open_store("first");
        let now = Utc::now();

        let record = record_outcome(&store, "u1", "w1", &quality(4), now).unwrap();
        assert_eq!(record.state.repetitions(), 1);
        assert_eq!(record.state.interval_days(), 1);
        assert_eq!(record.next_review_at, Some(now + Duration::days(1)));
        assert_eq!(record.total_attempts, 1);
        assert_eq!(record.total_correct, 1);

        let stored = store.get_review_record("u1", "w1").unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[test]
    fn outcomes_chain_through_stored_state() {
        let (_dir, store) = open_store("chain");
        let mut now = Utc::now();
        let mut intervals = Vec::new();
        for _ in 0..5 {
            let record = record_outcome(&store, "u1", "w1", &quality(4), now).unwrap();
            intervals.push(record.state.interval_days());
            now = record.next_review_at.unwrap();
        }
        assert_eq!(intervals, vec![1, 6, 15, 38, 95]);

        let lapsed = record_outcome(&store, "u1", "w1", &quality(1), now).unwrap();
        assert_eq!(lapsed.state.repetitions(), 0);
        assert_eq!(lapsed.state.interval_days(), 1);
        assert_eq!(lapsed.total_attempts, 6);
        assert_eq!(lapsed.total_correct, 5);
    }

    #[test]
    fn queue_ranks_due_items_by_priority() {
        let (_dir, store) = open_store("queue");
        let start = Utc::now() - Duration::days(30);

        // easy item: always right, low difficulty
        record_outcome(&store, "u1", "easy", &quality(5), start).unwrap();
        set_item_difficulty(&store, "easy", 10.0, start).unwrap();
        // hard item: wrong once, high difficulty
        record_outcome(&store, "u1", "hard", &quality(0), start).unwrap();
        set_item_difficulty(&store, "hard", 90.0, start).unwrap();
        // not due yet
        record_outcome(&store, "u1", "later", &quality(4), Utc::now()).unwrap();

        let queue = build_queue(&store, "u1", Utc::now(), limits(10)).unwrap();
        let ids: Vec<&str> = queue.iter().map(|c| c.candidate.item_id()).collect();
        assert_eq!(ids, vec!["hard", "easy"]);
        assert!(queue[0].priority > queue[1].priority);
        assert_eq!(queue[0].candidate.days_overdue(), 29);
    }

    #[test]
    fn queue_respects_limit_and_other_learners() {
        let (_dir, store) = open_store("queue-limit");
        let past = Utc::now() - Duration::days(3);
        for i in 0..5 {
            record_outcome(&store, "u1", &format!("w{i}"), &quality(3), past).unwrap();
        }
        record_outcome(&store, "u2", "x", &quality(3), past).unwrap();

        assert_eq!(build_queue(&store, "u1", Utc::now(), limits(3)).unwrap().len(), 3);
        assert_eq!(build_queue(&store, "u2", Utc::now(), limits(10)).unwrap().len(), 1);
        assert!(build_queue(&store, "nobody", Utc::now(), limits(10))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn reset_starts_over() {
        let (_dir, store) = open_store("reset");
        let now = Utc::now();
        record_outcome(&store, "u1", "w1", &quality(4), now).unwrap();
        record_outcome(&store, "u1", "w1", &quality(4), now).unwrap();

        assert!(reset_item(&store, "u1", "w1").unwrap());
        let record = record_outcome(&store, "u1", "w1", &quality(4), now).unwrap();
        assert_eq!(record.state.repetitions(), 1);
        assert_eq!(record.total_attempts, 1);
    }

    #[test]
    fn snapshots_cover_every_learner() {
        let (_dir, store) = open_store("snapshots");
        let past = Utc::now() - Duration::days(2);
        record_outcome(&store, "a", "w1", &quality(2), past).unwrap();
        record_outcome(&store, "b", "w2", &quality(4), past).unwrap();

        let written = snapshot_all_queues(&store, Utc::now(), limits(10)).unwrap();
        assert_eq!(written, 2);

        let snapshot = store.get_queue_snapshot("a").unwrap().unwrap();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].candidate.item_id(), "w1");
    }

    #[test]
    fn huge_intervals_do_not_overflow_due_date() {
        let now = Utc::now();
        let due = next_review_at(now, u32::MAX);
        assert_eq!(due, now + Duration::days(i64::from(MAX_SCHEDULE_DAYS)));
    }
}
