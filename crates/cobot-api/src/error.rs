//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Pipeline error: {0}")]
    Worker(#[from] cobot_worker::WorkerError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Worker(e) if e.is_backpressure() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) | ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Detail sent instead of internal error text in production.
pub const REDACTED_DETAIL: &str = "An internal error occurred";

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// A 500 response that reveals nothing about the cause.
pub fn redacted_internal_error() -> Response {
    let detail = REDACTED_DETAIL.to_string();
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { detail })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        let mut response = (status, Json(ErrorResponse { detail })).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert("Retry-After", axum::http::HeaderValue::from_static("5"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobot_worker::WorkerError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(WorkerError::QueueFull { capacity: 1 })
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(WorkerError::ShuttingDown)
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::internal("x").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_redacted_response_is_500() {
        assert_eq!(
            redacted_internal_error().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
