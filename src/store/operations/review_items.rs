use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Difficulty rating assigned to an item before a learner's queue is built.
pub const DEFAULT_DIFFICULTY_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub item_id: String,
    pub difficulty_score: f64,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn get_review_item(&self, item_id: &str) -> Result<Option<ReviewItem>, StoreError> {
        let key = keys::review_item_key(item_id)?;
        match self.review_items.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn upsert_review_item(&self, item: &ReviewItem) -> Result<(), StoreError> {
        if !item.difficulty_score.is_finite() || !(0.0..=100.0).contains(&item.difficulty_score)
        {
            return Err(StoreError::Validation(format!(
                "difficultyScore must be in 0..=100, got {}",
                item.difficulty_score
            )));
        }
        let key = keys::review_item_key(&item.item_id)?;
        self.review_items
            .insert(key.as_bytes(), Self::serialize(item)?)?;
        Ok(())
    }

    /// Difficulty per requested item, falling back to the default for items
    /// that were never rated.
    pub fn get_difficulty_scores(
        &self,
        item_ids: &[String],
    ) -> Result<HashMap<String, f64>, StoreError> {
        let mut scores = HashMap::with_capacity(item_ids.len());
        for item_id in item_ids {
            if scores.contains_key(item_id) {
                continue;
            }
            let score = self
                .get_review_item(item_id)?
                .map(|item| item.difficulty_score)
                .unwrap_or(DEFAULT_DIFFICULTY_SCORE);
            scores.insert(item_id.clone(), score);
        }
        Ok(scores)
    }
}
