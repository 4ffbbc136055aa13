use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::services::review_session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:item_id", get(get_item).put(put_item))
}

async fn get_item(
    Path(item_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let item = state
        .store()
        .get_review_item(&item_id)?
        .ok_or_else(|| AppError::not_found("Review item not found"))?;
    Ok(ok(item))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutItemRequest {
    difficulty_score: f64,
}

async fn put_item(
    Path(item_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PutItemRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let item = review_session::set_item_difficulty(
        state.store(),
        &item_id,
        req.difficulty_score,
        Utc::now(),
    )?;
    Ok(ok(item))
}
