//! Handlers for `/analytics` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/analytics/overview` | Headcounts by role, activity and district |

use std::sync::Arc;

use attendee_core::{
  notify::Notifier, service::AttendanceService, stats::Overview, store::AttendanceStore,
};
use axum::extract::State;

use crate::{error::ApiError, extract::Json};

/// `GET /analytics/overview`
pub async fn overview<S, N>(
  State(svc): State<Arc<AttendanceService<S, N>>>,
) -> Result<Json<Overview>, ApiError>
where
  S: AttendanceStore,
  N: Notifier,
{
  Ok(Json(svc.overview().await?))
}
