//! JSON REST API for Attendee.
//!
//! Exposes an axum [`Router`] backed by an
//! [`AttendanceService`](attendee_core::service::AttendanceService) over any
//! store and notifier. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", attendee_api::api_router(service.clone()))
//! ```

pub mod analytics;
pub mod attendance;
pub mod error;
pub mod extract;
pub mod schools;
pub mod subjects;

use std::sync::Arc;

use attendee_core::{notify::Notifier, service::AttendanceService, store::AttendanceStore};
use axum::{
  Router,
  routing::{get, post, put},
};

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(service: Arc<AttendanceService<S, N>>) -> Router<()>
where
  S: AttendanceStore + 'static,
  N: Notifier + 'static,
{
  Router::new()
    // Attendance
    .route(
      "/attendance",
      get(attendance::list::<S, N>).post(attendance::scan::<S, N>),
    )
    .route("/attendance/manual", post(attendance::manual::<S, N>))
    .route("/attendance/status", put(attendance::set_status::<S, N>))
    .route("/attendance/today", get(attendance::today::<S, N>))
    .route("/attendance/stats", get(attendance::stats::<S, N>))
    .route("/attendance/auto-exit", post(attendance::auto_exit::<S, N>))
    .route(
      "/attendance/check-low-attendance",
      post(attendance::check_low::<S, N>),
    )
    .route(
      "/attendance/{id}",
      get(attendance::get_one::<S, N>).delete(attendance::delete_one::<S, N>),
    )
    // Subjects
    .route(
      "/subjects",
      get(subjects::list::<S, N>).post(subjects::create::<S, N>),
    )
    .route(
      "/subjects/{id}",
      get(subjects::get_one::<S, N>)
        .put(subjects::update_one::<S, N>)
        .delete(subjects::delete_one::<S, N>),
    )
    .route("/subjects/{id}/active", put(subjects::set_active::<S, N>))
    .route("/subjects/{id}/presence", get(subjects::presence::<S, N>))
    // Schools
    .route("/schools", get(schools::list::<S, N>).post(schools::create::<S, N>))
    .route(
      "/schools/{id}",
      get(schools::get_one::<S, N>)
        .put(schools::update_one::<S, N>)
        .delete(schools::delete_one::<S, N>),
    )
    .route("/schools/{id}/stats", get(schools::stats::<S, N>))
    // Analytics
    .route("/analytics/overview", get(analytics::overview::<S, N>))
    .with_state(service)
}
