//! The `AttendanceStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `attendee-store-sqlite`). It covers both the record store and the identity
//! lookups the core needs; higher layers depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  autoclose::Cleanup,
  ledger::Toggle,
  record::DayRecord,
  school::{NewSchool, School, SchoolPatch},
  subject::{NewSubject, Role, Subject, SubjectPatch},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`AttendanceStore::list_subjects`].
#[derive(Debug, Clone, Default)]
pub struct SubjectFilter {
  pub role:         Option<Role>,
  pub exclude_role: Option<Role>,
  pub school_id:    Option<Uuid>,
  pub active:       Option<bool>,
}

impl SubjectFilter {
  /// Everyone except holders of `role`; the attendance roster excludes admins.
  pub fn excluding(role: Role) -> Self {
    Self { exclude_role: Some(role), ..Default::default() }
  }
}

/// Parameters for [`AttendanceStore::list_records`]. Results are ordered by
/// date, newest first.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  pub subject_id: Option<Uuid>,
  /// Inclusive lower bound on the record date.
  pub start_date: Option<NaiveDate>,
  /// Inclusive upper bound on the record date.
  pub end_date:   Option<NaiveDate>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Attendee store backend.
///
/// [`toggle_session`](Self::toggle_session) and
/// [`discard_open_sessions`](Self::discard_open_sessions) must be atomic per
/// record: concurrent calls for the same (subject, date) are serialised.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AttendanceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Subjects ──────────────────────────────────────────────────────────

  fn add_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Resolve a physical tag to its subject.
  fn find_subject_by_tag<'a>(
    &'a self,
    tag: &'a str,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + 'a;

  fn list_subjects<'a>(
    &'a self,
    filter: &'a SubjectFilter,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + 'a;

  /// Apply `patch`; returns `None` if the subject does not exist.
  fn update_subject(
    &self,
    id: Uuid,
    patch: SubjectPatch,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Returns `false` if the subject did not exist.
  fn delete_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Schools ───────────────────────────────────────────────────────────

  fn add_school(
    &self,
    input: NewSchool,
  ) -> impl Future<Output = Result<School, Self::Error>> + Send + '_;

  fn get_school(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<School>, Self::Error>> + Send + '_;

  fn list_schools(
    &self,
  ) -> impl Future<Output = Result<Vec<School>, Self::Error>> + Send + '_;

  fn update_school(
    &self,
    id: Uuid,
    patch: SchoolPatch,
  ) -> impl Future<Output = Result<Option<School>, Self::Error>> + Send + '_;

  /// Subjects of a deleted school become unaffiliated.
  fn delete_school(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Day records ───────────────────────────────────────────────────────

  fn find_day_record(
    &self,
    subject_id: Uuid,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<DayRecord>, Self::Error>> + Send + '_;

  fn get_day_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DayRecord>, Self::Error>> + Send + '_;

  fn create_day_record(
    &self,
    record: DayRecord,
  ) -> impl Future<Output = Result<DayRecord, Self::Error>> + Send + '_;

  /// Overwrite sessions, legacy mirrors and status of an existing record.
  fn update_day_record(
    &self,
    record: DayRecord,
  ) -> impl Future<Output = Result<DayRecord, Self::Error>> + Send + '_;

  /// Returns `false` if the record did not exist.
  fn delete_day_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Atomically run [`crate::ledger::toggle`] against the subject's record for
  /// `at`'s local date and persist the result.
  fn toggle_session(
    &self,
    subject_id: Uuid,
    at: DateTime<FixedOffset>,
  ) -> impl Future<Output = Result<Toggle, Self::Error>> + Send + '_;

  /// Atomically run [`crate::autoclose::discard_open_sessions`] against one
  /// record, writing back or deleting it. `None` if the record is gone.
  fn discard_open_sessions(
    &self,
    record_id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Cleanup>, Self::Error>> + Send + '_;

  /// Records dated `date` with at least one open session.
  fn list_open_records_for_date(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DayRecord>, Self::Error>> + Send + '_;

  fn list_records_for_date(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DayRecord>, Self::Error>> + Send + '_;

  fn list_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<DayRecord>, Self::Error>> + Send + 'a;

  /// Number of records matching `query`'s filters; `limit` and `offset` are
  /// ignored.
  fn count_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}
