//! Error-to-HTTP response conversion for the on-demand API.

use crate::domain::ItemFailure;
use crate::ports::storage::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{}: {}", .0.kind, .0.message)]
    Pipeline(ItemFailure),
    #[error("scheduler is shut down")]
    Unavailable,
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(key) => ApiError::NotFound(key),
            other => ApiError::Store(other),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Pipeline(_) | ApiError::Store(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> String {
        match self {
            ApiError::BadRequest(_) => "bad_request".to_string(),
            ApiError::NotFound(_) => "not_found".to_string(),
            ApiError::Pipeline(failure) => failure.kind.to_string(),
            ApiError::Unavailable => "unavailable".to_string(),
            ApiError::Store(_) => "storage_error".to_string(),
            ApiError::Io(_) => "io_error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Server error in API handler");
        }

        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, axum::Json(body)).into_response()
    }
}
