// Service Error Taxonomy
//
// Raw store failures stop at the service boundary. Callers only ever see one
// of these four kinds; the HTTP layer maps them to 400 / 404 / 500.

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Caller-supplied input missing or malformed
    #[error("{0}")]
    Validation(String),

    /// No record matched the query
    #[error("{0}")]
    NotFound(String),

    /// Reading from the store failed (includes timeouts and shutdown)
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Writing to the store failed
    #[error("persistence failed: {0}")]
    Persistence(#[source] StoreError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}

/// Returns the value, untouched, when present and non-empty
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
