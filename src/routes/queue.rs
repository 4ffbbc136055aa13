use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::extractors::QueryParams;
use crate::response::{ok, AppError};
use crate::services::review_session::{self, QueueLimits};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:learner_id", get(due_queue))
        .route("/:learner_id/snapshot", get(latest_snapshot))
}

#[derive(Debug, Deserialize)]
struct QueueQuery {
    limit: Option<usize>,
}

async fn due_queue(
    Path(learner_id): Path<String>,
    QueryParams(q): QueryParams<QueueQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let queue_cfg = &state.config().queue;
    let limits = QueueLimits {
        limit: q
            .limit
            .unwrap_or(queue_cfg.default_limit)
            .clamp(1, queue_cfg.max_limit),
        max_due_scan: queue_cfg.max_due_scan,
    };
    let queue = review_session::build_queue(state.store(), &learner_id, Utc::now(), limits)?;
    Ok(ok(queue))
}

async fn latest_snapshot(
    Path(learner_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let snapshot = state
        .store()
        .get_queue_snapshot(&learner_id)?
        .ok_or_else(|| AppError::not_found("No queue snapshot for this learner yet"))?;
    Ok(ok(snapshot))
}
