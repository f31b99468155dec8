//! HTTP server for Attendee.
//!
//! Composes the JSON API from `attendee-api` with operator authentication and
//! request tracing. The binary in `main.rs` only loads configuration and
//! binds the listener.

pub mod auth;
pub mod error;
pub mod notifier;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use attendee_core::{
  clock::{LocalClock, parse_offset, parse_time_of_day},
  notify::Notifier,
  service::{AttendancePolicy, AttendanceService},
  store::AttendanceStore,
};
use axum::{Router, middleware};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ATTENDEE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  pub auth_username:        String,
  pub auth_password_hash:   String,
  /// Regional offset applied to terminal timestamps, e.g. `+05:30`.
  #[serde(default = "default_utc_offset")]
  pub utc_offset:           String,
  /// Local time after which open sessions are discarded.
  #[serde(default = "default_cutoff")]
  pub cutoff:               String,
  #[serde(default = "default_low_attendance_hours")]
  pub low_attendance_hours: f64,
  /// Recipients of the daily low-attendance summary.
  #[serde(default)]
  pub operator_emails:      Vec<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5000 }
fn default_store_path() -> PathBuf { PathBuf::from("attendee.db") }
fn default_utc_offset() -> String { "+05:30".to_string() }
fn default_cutoff() -> String { "22:00".to_string() }
fn default_low_attendance_hours() -> f64 { 2.0 }

impl ServerConfig {
  /// Parse the textual policy settings.
  pub fn policy(&self) -> Result<AttendancePolicy, Error> {
    Ok(AttendancePolicy {
      clock:                LocalClock::new(parse_offset(&self.utc_offset)?),
      cutoff:               parse_time_of_day(&self.cutoff)?,
      low_attendance_hours: self.low_attendance_hours,
    })
  }

  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      username:      self.auth_username.clone(),
      password_hash: self.auth_password_hash.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs.
pub struct AppState<S, N> {
  pub service: Arc<AttendanceService<S, N>>,
  pub auth:    Arc<AuthConfig>,
}

impl<S, N> Clone for AppState<S, N> {
  fn clone(&self) -> Self {
    Self { service: Arc::clone(&self.service), auth: Arc::clone(&self.auth) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`]: the JSON API under `/api`, guarded by Basic
/// auth except for the device scan endpoint.
pub fn router<S, N>(state: AppState<S, N>) -> Router
where
  S: AttendanceStore + 'static,
  N: Notifier + 'static,
{
  Router::new()
    .nest("/api", attendee_api::api_router(state.service))
    .layer(middleware::from_fn_with_state(state.auth, require_auth))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
