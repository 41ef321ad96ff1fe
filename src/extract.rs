use async_trait::async_trait;
use axum::{
    extract::{rejection::PathRejection, FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

/// `axum::Json`, but a malformed or mistyped body becomes a
/// `validation_error` response instead of a plain-text rejection.
#[derive(Debug, Clone, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// Integer record id from the `:id` path segment. An id that is not a
/// 64-bit integer names no record, so it is a `not_found`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(PathRejection::FailedToDeserializePathParams(err)) => {
                debug!("unusable record id in {}: {}", parts.uri.path(), err.body_text());
                Err(AppError::NotFound("Resource"))
            }
            Err(rejection) => Err(AppError::Other(anyhow::anyhow!(rejection.body_text()))),
        }
    }
}
