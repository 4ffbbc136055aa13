use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::extractors::{JsonBody, QueryParams};
use crate::response::{ok, AppError};
use crate::services::review_session::{self, ReviewOutcome};
use crate::state::AppState;
use crate::store::operations::review_records::ReviewRecord;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:learner_id", get(list_records))
        .route(
            "/:learner_id/:item_id",
            get(get_record).post(record_outcome).delete(reset_record),
        )
}

async fn get_record(
    Path((learner_id, item_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let record = state
        .store()
        .get_review_record(&learner_id, &item_id)?
        .unwrap_or_else(|| ReviewRecord::fresh(&learner_id, &item_id, Utc::now()));
    Ok(ok(record))
}

async fn record_outcome(
    Path((learner_id, item_id)): Path<(String, String)>,
    State(state): State<AppState>,
    JsonBody(outcome): JsonBody<ReviewOutcome>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let record =
        review_session::record_outcome(state.store(), &learner_id, &item_id, &outcome, Utc::now())?;
    Ok(ok(record))
}

async fn reset_record(
    Path((learner_id, item_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let removed = review_session::reset_item(state.store(), &learner_id, &item_id)?;
    Ok(ok(serde_json::json!({ "reset": removed })))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_records(
    Path(learner_id): Path<String>,
    QueryParams(q): QueryParams<ListQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let limit = q.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let offset = q.offset.unwrap_or(0);
    let records = state
        .store()
        .list_learner_records(&learner_id, limit, offset)?;
    Ok(ok(records))
}
