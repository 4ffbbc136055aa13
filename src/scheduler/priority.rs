//! Due-queue priority ranking.
//!
//! A candidate's priority blends how late it is, how often the learner gets it
//! wrong, and how hard the item is rated. Scores are integers in `0..=100` and
//! are only ever used to order a queue.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::ScheduleError;

const OVERDUE_WEIGHT: f64 = 0.4;
const SUCCESS_WEIGHT: f64 = 0.3;
const DIFFICULTY_WEIGHT: f64 = 0.3;

/// Each day late adds this much to the overdue score.
const OVERDUE_POINTS_PER_DAY: i64 = 10;
/// Past this many days the overdue score stops growing.
const OVERDUE_CAP_DAYS: i64 = 10;

const MAX_PERCENT: f64 = 100.0;

/// One due item as seen by the ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQueueCandidate", rename_all = "camelCase")]
pub struct QueueCandidate {
    item_id: String,
    days_overdue: i64,
    success_rate: f64,
    difficulty_score: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQueueCandidate {
    item_id: String,
    days_overdue: i64,
    success_rate: f64,
    difficulty_score: f64,
}

impl TryFrom<RawQueueCandidate> for QueueCandidate {
    type Error = ScheduleError;

    fn try_from(raw: RawQueueCandidate) -> Result<Self, Self::Error> {
        Self::new(
            raw.item_id,
            raw.days_overdue,
            raw.success_rate,
            raw.difficulty_score,
        )
    }
}

fn check_percent(field: &'static str, value: f64) -> Result<f64, ScheduleError> {
    if value.is_finite() && (0.0..=MAX_PERCENT).contains(&value) {
        Ok(value)
    } else {
        Err(ScheduleError::PercentOutOfRange { field, value })
    }
}

impl QueueCandidate {
    /// `days_overdue` may be negative for items that are not due yet; they
    /// get no overdue contribution. Both percentages must lie in `0..=100`.
    pub fn new(
        item_id: impl Into<String>,
        days_overdue: i64,
        success_rate: f64,
        difficulty_score: f64,
    ) -> Result<Self, ScheduleError> {
        Ok(Self {
            item_id: item_id.into(),
            days_overdue,
            success_rate: check_percent("successRate", success_rate)?,
            difficulty_score: check_percent("difficultyScore", difficulty_score)?,
        })
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn days_overdue(&self) -> i64 {
        self.days_overdue
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    pub fn difficulty_score(&self) -> f64 {
        self.difficulty_score
    }
}

/// A candidate together with the priority it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: QueueCandidate,
    pub priority: u8,
}

fn overdue_score(days_overdue: i64) -> f64 {
    (days_overdue.clamp(0, OVERDUE_CAP_DAYS) * OVERDUE_POINTS_PER_DAY) as f64
}

pub fn compute_priority(candidate: &QueueCandidate) -> u8 {
    let failure_score = MAX_PERCENT - candidate.success_rate;
    let raw = overdue_score(candidate.days_overdue) * OVERDUE_WEIGHT
        + failure_score * SUCCESS_WEIGHT
        + candidate.difficulty_score * DIFFICULTY_WEIGHT;
    raw.round().clamp(0.0, MAX_PERCENT) as u8
}

struct Slot {
    index: usize,
    scored: ScoredCandidate,
}

// Priority desc, then days overdue desc, then input position. Total, so the
// unstable top-k selection agrees with the full stable sort.
fn slot_order(a: &Slot, b: &Slot) -> Ordering {
    b.scored
        .priority
        .cmp(&a.scored.priority)
        .then_with(|| {
            b.scored
                .candidate
                .days_overdue
                .cmp(&a.scored.candidate.days_overdue)
        })
        .then_with(|| a.index.cmp(&b.index))
}

fn into_slots(candidates: Vec<QueueCandidate>) -> Vec<Slot> {
    candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| Slot {
            index,
            scored: ScoredCandidate {
                priority: compute_priority(&candidate),
                candidate,
            },
        })
        .collect()
}

/// Scores and orders every candidate, highest priority first.
pub fn rank_queue_scored(candidates: Vec<QueueCandidate>) -> Vec<ScoredCandidate> {
    let mut slots = into_slots(candidates);
    slots.sort_by(slot_order);
    slots.into_iter().map(|slot| slot.scored).collect()
}

pub fn rank_queue(candidates: Vec<QueueCandidate>) -> Vec<QueueCandidate> {
    rank_queue_scored(candidates)
        .into_iter()
        .map(|scored| scored.candidate)
        .collect()
}

/// Returns the first `k` entries of `rank_queue_scored` without sorting the
/// whole set.
pub fn top_k(candidates: Vec<QueueCandidate>, k: usize) -> Vec<ScoredCandidate> {
    if k == 0 {
        return Vec::new();
    }

    let mut slots = into_slots(candidates);
    if slots.len() > k {
        slots.select_nth_unstable_by(k - 1, slot_order);
        slots.truncate(k);
    }
    slots.sort_by(slot_order);
    slots.into_iter().map(|slot| slot.scored).collect()
}
