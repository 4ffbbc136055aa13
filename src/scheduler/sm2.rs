//! SM-2 review state calculator.
//!
//! Each recorded outcome moves a `(repetitions, interval_days, ease_factor)`
//! triple forward by exactly one step. A lapse (quality < 3) collapses the
//! interval back to one day; successes grow it geometrically by the ease
//! factor once the first two fixed steps (1 day, 6 days) are behind it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ScheduleError;

/// Floor applied to every recomputed ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor of a freshly scheduled item.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

const MAX_QUALITY: u8 = 5;
const PASSING_QUALITY: u8 = 3;

/// Recall quality on the 0 (blackout) to 5 (effortless) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const BLACKOUT: Quality = Quality(0);
    pub const PERFECT: Quality = Quality(MAX_QUALITY);

    pub fn new(value: u8) -> Result<Self, ScheduleError> {
        if value > MAX_QUALITY {
            return Err(ScheduleError::QualityOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 >= PASSING_QUALITY
    }
}

impl TryFrom<u8> for Quality {
    type Error = ScheduleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(value: Quality) -> Self {
        value.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse self-assessment a learner gives after seeing the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfRating {
    Again,
    Hard,
    Good,
    Easy,
}

impl SelfRating {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }

    /// Parses a UI label, treating anything unrecognized as `Hard` so that a
    /// correct answer with an odd label still lands on the passing threshold.
    pub fn from_label_lenient(label: &str) -> Self {
        label.parse().unwrap_or(Self::Hard)
    }
}

impl FromStr for SelfRating {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" => Ok(Self::Again),
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            _ => Err(ScheduleError::UnknownRating(s.to_string())),
        }
    }
}

/// Maps a self-rating onto the numeric quality scale. An incorrect answer is
/// always a blackout, whatever the learner clicked.
pub fn self_rating_to_quality(rating: SelfRating, was_correct: bool) -> Quality {
    if !was_correct {
        return Quality::BLACKOUT;
    }
    match rating {
        SelfRating::Again => Quality(2),
        SelfRating::Hard => Quality(3),
        SelfRating::Good => Quality(4),
        SelfRating::Easy => Quality(5),
    }
}

/// Scheduling state of one learner-item pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReviewState", rename_all = "camelCase")]
pub struct ReviewState {
    repetitions: u32,
    interval_days: u32,
    ease_factor: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReviewState {
    repetitions: u32,
    interval_days: u32,
    ease_factor: f64,
}

impl TryFrom<RawReviewState> for ReviewState {
    type Error = ScheduleError;

    fn try_from(raw: RawReviewState) -> Result<Self, Self::Error> {
        Self::new(raw.repetitions, raw.interval_days, raw.ease_factor)
    }
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            repetitions: 0,
            interval_days: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
        }
    }
}

impl ReviewState {
    pub fn new(
        repetitions: u32,
        interval_days: u32,
        ease_factor: f64,
    ) -> Result<Self, ScheduleError> {
        if !ease_factor.is_finite() || ease_factor < MIN_EASE_FACTOR {
            return Err(ScheduleError::EaseFactorOutOfRange {
                value: ease_factor,
                min: MIN_EASE_FACTOR,
            });
        }
        Ok(Self {
            repetitions,
            interval_days,
            ease_factor,
        })
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    pub fn advance(&self, quality: Quality) -> ReviewState {
        advance_review_state(quality, self)
    }
}

fn next_ease_factor(previous: f64, quality: Quality) -> f64 {
    let miss = f64::from(MAX_QUALITY - quality.get());
    let ease = previous + (0.1 - miss * (0.08 + miss * 0.02));
    ease.max(MIN_EASE_FACTOR)
}

/// Computes the state that follows `previous` after an outcome of `quality`.
pub fn advance_review_state(quality: Quality, previous: &ReviewState) -> ReviewState {
    let ease_factor = next_ease_factor(previous.ease_factor, quality);

    if !quality.is_success() {
        return ReviewState {
            repetitions: 0,
            interval_days: 1,
            ease_factor,
        };
    }

    let interval_days = match previous.repetitions {
        0 => 1,
        1 => 6,
        // f64 -> u32 `as` saturates, so runaway intervals pin at u32::MAX
        _ => (f64::from(previous.interval_days) * ease_factor).round() as u32,
    };

    ReviewState {
        repetitions: previous.repetitions.saturating_add(1),
        interval_days,
        ease_factor,
    }
}
