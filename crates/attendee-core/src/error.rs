//! Error types for `attendee-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::subject::Subject;

/// Errors raised by the pure parts of the core: configuration parsing and
/// value decoding.
#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid utc offset: {0:?}")]
  InvalidOffset(String),

  #[error("invalid time of day: {0:?}")]
  InvalidTimeOfDay(String),

  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("unknown attendance status: {0:?}")]
  UnknownStatus(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Outcome of a failed [`AttendanceService`](crate::service::AttendanceService)
/// operation, generic over the store's error type.
///
/// Everything except [`ServiceError::Store`] is terminal for the request and
/// leaves the store untouched.
#[derive(Debug, Error)]
pub enum ServiceError<E>
where
  E: std::error::Error + 'static,
{
  #[error("no subject registered for tag {0:?}")]
  UnknownTag(String),

  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("school not found: {0}")]
  SchoolNotFound(Uuid),

  #[error("attendance record not found: {0}")]
  RecordNotFound(Uuid),

  #[error("subject {} is inactive; attendance not recorded", .0.subject_id)]
  Inactive(Box<Subject>),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The record store failed. Retryable; no partial write is assumed.
  #[error("store error: {0}")]
  Store(#[source] E),
}
