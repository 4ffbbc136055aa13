//! Stateless access to the scheduling core for callers that keep their own
//! state: nothing here reads or writes the store.

use axum::extract::State;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::scheduler::{
    advance_review_state, compute_priority, rank_queue_scored, QueueCandidate, ReviewState,
};
use crate::services::review_session::ReviewOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/advance", post(advance))
        .route("/priority", post(priority))
        .route("/rank", post(rank))
}

#[derive(Debug, Deserialize)]
struct AdvanceRequest {
    #[serde(default)]
    state: ReviewState,
    #[serde(flatten)]
    outcome: ReviewOutcome,
}

async fn advance(
    JsonBody(req): JsonBody<AdvanceRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let quality = req.outcome.quality();
    let next = advance_review_state(quality, &req.state);
    Ok(ok(serde_json::json!({
        "quality": quality,
        "state": next,
    })))
}

async fn priority(
    JsonBody(candidate): JsonBody<QueueCandidate>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Ok(ok(serde_json::json!({
        "itemId": candidate.item_id(),
        "priority": compute_priority(&candidate),
    })))
}

#[derive(Debug, Deserialize)]
struct RankRequest {
    candidates: Vec<QueueCandidate>,
}

async fn rank(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RankRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let max = state.config().queue.max_batch_size;
    if req.candidates.len() > max {
        return Err(AppError::bad_request(
            "BATCH_TOO_LARGE",
            &format!("rank accepts at most {max} candidates"),
        ));
    }
    Ok(ok(rank_queue_scored(req.candidates)))
}
