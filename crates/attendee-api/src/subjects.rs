//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | Optional `?role=`, `school_id=`, `active=` |
//! | `POST`   | `/subjects` | Body: [`NewSubject`]; 409 if the tag is taken |
//! | `GET`    | `/subjects/{id}` | 404 if not found |
//! | `PUT`    | `/subjects/{id}` | Body: [`SubjectPatch`]; `null` clears `email` or `school_id` |
//! | `DELETE` | `/subjects/{id}` | 409 while attendance records exist |
//! | `PUT`    | `/subjects/{id}/active` | Body: `{"active":false}` |
//! | `GET`    | `/subjects/{id}/presence` | Optional `?date=YYYY-MM-DD` |

use std::sync::Arc;

use attendee_core::{
  notify::Notifier,
  service::{AttendanceService, PresenceView},
  store::{AttendanceStore, SubjectFilter},
  subject::{NewSubject, Role, Subject, SubjectPatch},
};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  attendance::DateParams,
  error::ApiError,
  extract::{Json, Path, Query},
};

type Svc<S, N> = State<Arc<AttendanceService<S, N>>>;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub role:      Option<Role>,
  pub school_id: Option<Uuid>,
  pub active:    Option<bool>,
}

/// `GET /subjects[?role=<role>][&school_id=<id>][&active=<bool>]`
pub async fn list<S, N>(
  State(svc): Svc<S, N>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Subject>>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  let filter = SubjectFilter {
    role: params.role,
    school_id: params.school_id,
    active: params.active,
    ..Default::default()
  };
  let subjects = svc
    .store()
    .list_subjects(&filter)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(subjects))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /subjects`
pub async fn create<S, N>(
  State(svc): Svc<S, N>,
  Json(body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  if body.rfid_tag.trim().is_empty() {
    return Err(ApiError::BadRequest("rfid_tag must not be empty".into()));
  }
  let subject = svc.create_subject(body).await?;
  Ok((StatusCode::CREATED, Json(subject)))
}

// ─── Single subject ──────────────────────────────────────────────────────────

/// `GET /subjects/{id}`
pub async fn get_one<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  Ok(Json(svc.get_subject(id).await?))
}

/// `PUT /subjects/{id}`
pub async fn update_one<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
  Json(patch): Json<SubjectPatch>,
) -> Result<Json<Subject>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  Ok(Json(svc.update_subject(id, patch).await?))
}

/// `DELETE /subjects/{id}`
pub async fn delete_one<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  svc.delete_subject(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `PUT /subjects/{id}/active`
pub async fn set_active<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<Subject>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  let patch = SubjectPatch { active: Some(body.active), ..Default::default() };
  Ok(Json(svc.update_subject(id, patch).await?))
}

/// `GET /subjects/{id}/presence[?date=YYYY-MM-DD]`
pub async fn presence<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
  Query(params): Query<DateParams>,
) -> Result<Json<PresenceView>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  Ok(Json(svc.presence(id, params.date).await?))
}
