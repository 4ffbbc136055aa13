//! Pure scheduling core: the SM-2 review state calculator and the due-queue
//! priority ranker. Nothing in here touches the store or the clock.

pub mod priority;
pub mod sm2;

use thiserror::Error;

pub use priority::{
    compute_priority, rank_queue, rank_queue_scored, top_k, QueueCandidate, ScoredCandidate,
};
pub use sm2::{
    advance_review_state, self_rating_to_quality, Quality, ReviewState, SelfRating,
    DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("quality must be in 0..=5, got {0}")]
    QualityOutOfRange(u8),
    #[error("ease factor must be a finite value >= {min}, got {value}")]
    EaseFactorOutOfRange { value: f64, min: f64 },
    #[error("{field} must be a finite value in 0..=100, got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },
    #[error("unknown self rating: {0}")]
    UnknownRating(String),
}
