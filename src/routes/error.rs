//! JSON error responses shared by the API handlers.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

use crate::storage::StorageError;

// ---

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    details: String,
}

/// An error that renders as `{"error": ..., "details": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: String,
}

impl ApiError {
    // ---
    pub fn new(status: StatusCode, error: impl Into<String>, details: impl ToString) -> Self {
        Self {
            status,
            error: error.into(),
            details: details.to_string(),
        }
    }

    pub fn bad_request(details: impl ToString) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid request", details)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Validation(e) => Self::new(StatusCode::BAD_REQUEST, "invalid reading", e),
            StorageError::Database(e) => {
                tracing::error!("Storage failure: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage failure", e)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}
