//! Request body extractor accepting JSON or urlencoded forms.

use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Body decoded from `application/json` or
/// `application/x-www-form-urlencoded`.
///
/// A request without a `Content-Type` is treated as an empty body
/// (`T::default()`), so missing fields surface as validation errors.
/// Decoding failures are 400 `{error}`.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase);

        match content_type.as_deref() {
            None => Ok(Payload(T::default())),
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
                let Form(value) = Form::<T>::from_request(req, state)
                    .await
                    .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
                Ok(Payload(value))
            }
            Some(_) => {
                let Json(value) = Json::<T>::from_request(req, state)
                    .await
                    .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
                Ok(Payload(value))
            }
        }
    }
}
