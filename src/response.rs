use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::scheduler::ScheduleError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub is_operational: bool,
}

impl AppError {
    pub fn bad_request(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.to_string(),
            is_operational: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let exposed_message = if self.is_operational {
            self.message.clone()
        } else {
            "Internal server error".to_string()
        };

        if self.is_operational {
            tracing::warn!(
                status = %self.status,
                code = %self.code,
                error = %self.message,
                "API error"
            );
        } else {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                error = %self.message,
                "Internal API error"
            );
        }

        (
            self.status,
            Json(ErrorBody {
                success: false,
                code: self.code,
                message: exposed_message,
            }),
        )
            .into_response()
    }
}

// Validation failures are echoed back; everything else is redacted by
// IntoResponse.
impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match &value {
            StoreError::Validation(msg) => AppError::bad_request("VALIDATION_ERROR", msg),
            _ => AppError::internal(&value.to_string()),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(value: ScheduleError) -> Self {
        AppError::bad_request("VALIDATION_ERROR", &value.to_string())
    }
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data,
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::response::IntoResponse;

    use super::*;

    #[tokio::test]
    async fn internal_error_is_redacted() {
        let resp = AppError::internal("sled crash").into_response();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("sled crash"));
        assert!(text.contains("Internal server error"));
    }

    #[tokio::test]
    async fn bad_request_keeps_message() {
        let resp = AppError::bad_request("BAD_INPUT", "quality too high").into_response();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "BAD_INPUT");
        assert_eq!(json["message"], "quality too high");
        assert_eq!(json["success"], false);
    }

    #[test]
    fn store_validation_maps_to_400() {
        let err: AppError = StoreError::Validation("learner_id must not be empty".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn error_body_is_the_plain_envelope() {
        let resp = AppError::not_found("Review item not found").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "code": "NOT_FOUND",
                "message": "Review item not found",
            })
        );
    }

    #[test]
    fn store_failures_are_internal() {
        let err: AppError = StoreError::Migration {
            version: 3,
            message: "boom".into(),
        }
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_operational);
    }

    #[test]
    fn schedule_error_maps_to_400() {
        let err: AppError = ScheduleError::QualityOutOfRange(7).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains('7'));
    }
}
