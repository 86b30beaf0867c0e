//! API error type mapping domain failures to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chatwithyou_core::Error;
use serde_json::json;
use tracing::error;

/// Error returned by every handler; renders `{ "success": false, "error": ... }`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Forbidden(String),
    Validation(String),
    Unauthorized,
    RateLimited,
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound { kind, id } => ApiError::NotFound(format!("{kind} not found: {id}")),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            Error::Validation(msg) => ApiError::Validation(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(msg) | ApiError::Forbidden(msg) | ApiError::Validation(msg) => msg,
            ApiError::Unauthorized => "Missing or invalid bearer token".to_string(),
            ApiError::RateLimited => "Too many requests, please try again later".to_string(),
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
