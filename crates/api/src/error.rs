use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mapbot_common::MapbotError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Core service error: {0}")]
    CoreService(#[from] MapbotError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
            ApiError::CoreService(err) => match &err {
                MapbotError::InvalidArgument(_)
                | MapbotError::InvalidChunking { .. }
                | MapbotError::EmptyDocument(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string(), "VALIDATION_ERROR")
                }
                MapbotError::Embedding(_) => {
                    error!("Embedding error: {}", err);
                    (StatusCode::BAD_GATEWAY, "Embedding failed".to_string(), "EMBEDDING_ERROR")
                }
                _ => {
                    error!("Core service error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                        "INTERNAL_ERROR",
                    )
                }
            },
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        let response_body = json!({
            "success": false,
            "error": error_message,
            "error_code": error_code,
            "timestamp": chrono::Utc::now()
        });

        (status, Json(response_body)).into_response()
    }
}

// Helper function to create validation errors
pub fn validation_error(message: &str) -> ApiError {
    ApiError::Validation(message.to_string())
}

// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let response = validation_error("question is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_core_errors_map_to_status() {
        let empty = ApiError::from(MapbotError::EmptyDocument("doc".to_string()));
        assert_eq!(empty.into_response().status(), StatusCode::BAD_REQUEST);

        let embedding = ApiError::from(MapbotError::Embedding("offline".to_string()));
        assert_eq!(embedding.into_response().status(), StatusCode::BAD_GATEWAY);

        let mismatch = ApiError::from(MapbotError::DimensionMismatch {
            expected: 384,
            actual: 3,
        });
        assert_eq!(
            mismatch.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
