//! Error type for `attendee-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] attendee_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for tokio_rusqlite::Error {
  /// Lets decode failures surface from inside a `Connection::call` closure.
  fn from(e: Error) -> Self {
    match e {
      Error::Database(inner) => inner,
      other => tokio_rusqlite::Error::Other(Box::new(other)),
    }
  }
}
