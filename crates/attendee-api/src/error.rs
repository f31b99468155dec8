//! API error type and [`axum::response::IntoResponse`] implementation.

use attendee_core::ServiceError;
use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl<E> From<ServiceError<E>> for ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn from(e: ServiceError<E>) -> Self {
    match e {
      ServiceError::UnknownTag(_)
      | ServiceError::SubjectNotFound(_)
      | ServiceError::SchoolNotFound(_)
      | ServiceError::RecordNotFound(_) => ApiError::NotFound(e.to_string()),
      ServiceError::Inactive(_) => ApiError::Forbidden(e.to_string()),
      ServiceError::Conflict(m) => ApiError::Conflict(m),
      ServiceError::Store(inner) => ApiError::Store(Box::new(inner)),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
