use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::response::AppError;

/// `axum::Json<T>` that rejects with the API error envelope instead of
/// axum's plain-text body.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection_to_app_error(rejection)),
        }
    }
}

fn json_rejection_to_app_error(rejection: JsonRejection) -> AppError {
    match rejection {
        // data errors carry the serde message, e.g. an out-of-range quality
        JsonRejection::JsonDataError(e) => {
            tracing::warn!(error = %e, "JSON data deserialization failed");
            AppError::bad_request("INVALID_REQUEST_BODY", &e.body_text())
        }
        JsonRejection::MissingJsonContentType(e) => {
            tracing::warn!(error = %e, "Missing or invalid JSON Content-Type");
            AppError::bad_request("INVALID_REQUEST_BODY", "Expected an application/json body")
        }
        other => {
            tracing::warn!(error = %other, "Rejected JSON request body");
            AppError::bad_request("INVALID_REQUEST_BODY", "Malformed JSON request body")
        }
    }
}

/// `axum::extract::Query<T>` with the same error envelope as [`JsonBody`].
pub struct QueryParams<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(query_rejection_to_app_error(rejection)),
        }
    }
}

fn query_rejection_to_app_error(rejection: QueryRejection) -> AppError {
    tracing::warn!(error = %rejection, "Rejected query string");
    AppError::bad_request("INVALID_QUERY", &rejection.body_text())
}
