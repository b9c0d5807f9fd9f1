//! Response mapping for service results.
//!
//! Every user-visible API failure is `{"error": "<message>"}`. Store failures
//! become 500 with a fixed per-route message; the underlying error is logged,
//! never sent.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::ServiceError;

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// JSON confirmation body
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Maps a service error; `internal_message` replaces store failures
    pub fn from_service(err: ServiceError, internal_message: &str) -> Self {
        match err {
            ServiceError::Validation(message) => Self::bad_request(message),
            ServiceError::NotFound(message) => Self::not_found(message),
            ServiceError::StoreUnavailable(source) => {
                error!(error = %source, kind = "store_unavailable", "{internal_message}");
                Self::internal(internal_message)
            }
            ServiceError::Persistence(source) => {
                error!(error = %source, kind = "persistence", "{internal_message}");
                Self::internal(internal_message)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// `result.or_api_error("failed to ...")?` in handlers
pub trait OrApiError<T> {
    fn or_api_error(self, internal_message: &str) -> ApiResult<T>;
}

impl<T> OrApiError<T> for Result<T, ServiceError> {
    fn or_api_error(self, internal_message: &str) -> ApiResult<T> {
        self.map_err(|err| ApiError::from_service(err, internal_message))
    }
}
