//! HTTP Basic-auth verification for operator endpoints.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, Method},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use tracing::debug;

use crate::error::Error;

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify credentials directly from headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(())
}

/// Scanning terminals carry no credentials; only their one endpoint is open.
pub fn is_public(method: &Method, path: &str) -> bool {
  method == Method::POST && path.trim_end_matches('/') == "/api/attendance"
}

/// Middleware rejecting every non-public request without valid credentials.
pub async fn require_auth(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Response {
  if is_public(req.method(), req.uri().path()) {
    return next.run(req).await;
  }
  match verify_auth(req.headers(), &auth) {
    Ok(()) => next.run(req).await,
    Err(e) => {
      debug!(method = %req.method(), path = req.uri().path(), "rejected unauthenticated request");
      e.into_response()
    }
  }
}
