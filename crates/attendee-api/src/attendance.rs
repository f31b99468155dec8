//! Handlers for `/attendance` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/attendance` | Device scan `{"rfid_tag":"..","timestamp":".."}`; 201 when the day record is new |
//! | `POST`   | `/attendance/manual` | `{"subject_id":"..","timestamp":".."}` |
//! | `PUT`    | `/attendance/status` | `{"subject_id":"..","date":"YYYY-MM-DD","status":"late"}` |
//! | `GET`    | `/attendance` | Optional `subject_id`, `start_date`, `end_date`, `limit`, `offset` |
//! | `GET`    | `/attendance/today` | Optional `?date=YYYY-MM-DD` |
//! | `GET`    | `/attendance/stats` | Optional `start_date`, `end_date` |
//! | `GET`    | `/attendance/{id}` | 404 if not found |
//! | `DELETE` | `/attendance/{id}` | 204 on success |
//! | `POST`   | `/attendance/auto-exit` | Runs housekeeping at the current instant |
//! | `POST`   | `/attendance/check-low-attendance` | Optional body `{"date":"YYYY-MM-DD"}` |

use std::sync::Arc;

use attendee_core::{
  autoclose::AutoCloseOutcome,
  evaluate::LowAttendanceReport,
  notify::Notifier,
  record::{AttendanceStatus, DayRecord, EventKind},
  service::{AttendanceService, DaySummary, Recorded},
  stats::AttendanceStats,
  store::{AttendanceStore, RecordQuery},
};
use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Json, Path, Query},
};

type Svc<S, N> = State<Arc<AttendanceService<S, N>>>;

// ─── Scans ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScanBody {
  pub rfid_tag:  String,
  /// Local wall-clock time; absent or malformed means "now". Any JSON type
  /// is accepted so a bad value never costs the event.
  pub timestamp: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ManualBody {
  pub subject_id: Uuid,
  pub timestamp:  Option<Value>,
}

/// The timestamp text handed to the normaliser. Non-string values keep their
/// JSON text, which the normaliser then rejects as malformed.
fn timestamp_text(value: Option<Value>) -> Option<String> {
  match value {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) => Some(s),
    Some(other) => {
      warn!(timestamp = %other, "non-string timestamp received");
      Some(other.to_string())
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
  pub message: String,
  #[serde(flatten)]
  pub recorded: Recorded,
}

fn scan_response(recorded: Recorded) -> impl IntoResponse {
  let verb = match recorded.kind {
    EventKind::Entry => "Entry",
    EventKind::Exit => "Exit",
  };
  let status = if recorded.created { StatusCode::CREATED } else { StatusCode::OK };
  let message = format!("{verb} recorded (session {})", recorded.session_number);
  (status, Json(ScanResponse { message, recorded }))
}

/// `POST /attendance`
pub async fn scan<S, N>(
  State(svc): Svc<S, N>,
  Json(body): Json<ScanBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  let timestamp = timestamp_text(body.timestamp);
  let recorded = svc.record_event(&body.rfid_tag, timestamp.as_deref()).await?;
  Ok(scan_response(recorded))
}

/// `POST /attendance/manual`
pub async fn manual<S, N>(
  State(svc): Svc<S, N>,
  Json(body): Json<ManualBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  let timestamp = timestamp_text(body.timestamp);
  let recorded = svc.record_manual(body.subject_id, timestamp.as_deref()).await?;
  Ok(scan_response(recorded))
}

// ─── Status label ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub subject_id: Uuid,
  pub date:       NaiveDate,
  pub status:     AttendanceStatus,
}

/// `PUT /attendance/status`
pub async fn set_status<S, N>(
  State(svc): Svc<S, N>,
  Json(body): Json<StatusBody>,
) -> Result<Json<DayRecord>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  let record = svc.mark_status(body.subject_id, body.date, body.status).await?;
  Ok(Json(record))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub subject_id: Option<Uuid>,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

/// `GET /attendance[?subject_id=..][&start_date=..][&end_date=..][&limit=..][&offset=..]`
pub async fn list<S, N>(
  State(svc): Svc<S, N>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<DayRecord>>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  let query = RecordQuery {
    subject_id: params.subject_id,
    start_date: params.start_date,
    end_date:   params.end_date,
    limit:      params.limit,
    offset:     params.offset,
  };
  let records = svc
    .store()
    .list_records(&query)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct DateParams {
  pub date: Option<NaiveDate>,
}

/// `GET /attendance/today[?date=YYYY-MM-DD]`
pub async fn today<S, N>(
  State(svc): Svc<S, N>,
  Query(params): Query<DateParams>,
) -> Result<Json<DaySummary>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  Ok(Json(svc.day_summary(params.date).await?))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
}

impl RangeParams {
  pub fn validate(&self) -> Result<(), ApiError> {
    if let Some(start) = self.start_date
      && let Some(end) = self.end_date
      && start > end
    {
      return Err(ApiError::BadRequest(format!(
        "start_date {start} is after end_date {end}"
      )));
    }
    Ok(())
  }
}

/// `GET /attendance/stats[?start_date=..][&end_date=..]`
pub async fn stats<S, N>(
  State(svc): Svc<S, N>,
  Query(params): Query<RangeParams>,
) -> Result<Json<AttendanceStats>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  params.validate()?;
  Ok(Json(svc.stats(params.start_date, params.end_date).await?))
}

/// `GET /attendance/{id}`
pub async fn get_one<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
) -> Result<Json<DayRecord>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  Ok(Json(svc.get_record(id).await?))
}

/// `DELETE /attendance/{id}`
pub async fn delete_one<S, N>(
  State(svc): Svc<S, N>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  svc.delete_record(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Housekeeping ────────────────────────────────────────────────────────────

/// `POST /attendance/auto-exit`
pub async fn auto_exit<S, N>(
  State(svc): Svc<S, N>,
) -> Result<Json<AutoCloseOutcome>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  Ok(Json(svc.run_auto_close(Utc::now()).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckLowBody {
  pub date: Option<NaiveDate>,
}

/// `POST /attendance/check-low-attendance`; the body may be empty.
pub async fn check_low<S, N>(
  State(svc): Svc<S, N>,
  body: Bytes,
) -> Result<Json<LowAttendanceReport>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  let body: CheckLowBody = if body.is_empty() {
    CheckLowBody::default()
  } else {
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
  };
  Ok(Json(svc.evaluate_low_attendance(body.date).await?))
}
