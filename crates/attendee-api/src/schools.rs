//! Handlers for `/schools` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/schools` | |
//! | `POST`   | `/schools` | Body: `{"name":"..","district":"..","state":".."}` |
//! | `GET`    | `/schools/{id}` | 404 if not found |
//! | `PUT`    | `/schools/{id}` | Partial update |
//! | `DELETE` | `/schools/{id}` | Member subjects become unaffiliated |
//! | `GET`    | `/schools/{id}/stats` | Optional `start_date`, `end_date`; members only |

use std::sync::Arc;

use attendee_core::{
  notify::Notifier,
  school::{NewSchool, School, SchoolPatch},
  service::AttendanceService,
  stats::AttendanceStats,
  store::AttendanceStore,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::{
  attendance::RangeParams,
  error::ApiError,
  extract::{Json, Path, Query},
};

type Svc<S, N> = State<Arc<AttendanceService<S, N>>>;

/// `GET /schools`
pub async fn list<S, N>(State(svc): Svc<S, N>) -> Result<Json<Vec<School>>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  let schools = svc
    .store()
    .list_schools()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(schools))
}

/// `POST /schools`
pub async fn create<S, N>(
  State(svc): Svc<S, N>,
  Json(body): Json<NewSchool>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  let school = svc.create_school(body).await?;
  Ok((StatusCode::CREATED, Json(school)))
}

/// `GET /schools/{id}`
pub async fn get_one<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
) -> Result<Json<School>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  Ok(Json(svc.get_school(id).await?))
}

/// `PUT /schools/{id}`
pub async fn update_one<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
  Json(patch): Json<SchoolPatch>,
) -> Result<Json<School>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  Ok(Json(svc.update_school(id, patch).await?))
}

/// `DELETE /schools/{id}`
pub async fn delete_one<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  svc.delete_school(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /schools/{id}/stats[?start_date=..][&end_date=..]`
pub async fn stats<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
  Query(params): Query<RangeParams>,
) -> Result<Json<AttendanceStats>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  params.validate()?;
  Ok(Json(
    svc
      .school_stats(id, params.start_date, params.end_date)
      .await?,
  ))
}
