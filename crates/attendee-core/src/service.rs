//! [`AttendanceService`] — the operations exposed to transports.
//!
//! The service owns no state of its own. It resolves subjects, normalises
//! timestamps and hands the actual decisions to the pure modules, with the
//! store and notifier supplied by the caller.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  ServiceError,
  autoclose::{self, AutoCloseOutcome, AutoCloseSummary, Cleanup},
  clock::LocalClock,
  evaluate::{self, DEFAULT_THRESHOLD_HOURS, LowAttendanceReport},
  notify::Notifier,
  record::{AttendanceStatus, DayRecord, EventKind, Presence, round_hours},
  school::{NewSchool, School, SchoolPatch},
  stats::{self, AttendanceStats, Overview},
  store::{AttendanceStore, RecordQuery, SubjectFilter},
  subject::{NewSubject, Role, Subject, SubjectPatch},
};

pub type ServiceResult<T, E> = Result<T, ServiceError<E>>;

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Deployment-specific knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendancePolicy {
  pub clock:                LocalClock,
  /// Local time of day after which open sessions are discarded.
  pub cutoff:               NaiveTime,
  pub low_attendance_hours: f64,
}

impl Default for AttendancePolicy {
  fn default() -> Self {
    Self {
      clock:                LocalClock::default(),
      cutoff:               NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
      low_attendance_hours: DEFAULT_THRESHOLD_HOURS,
    }
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Outcome of a scan or manual entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorded {
  pub kind:           EventKind,
  pub session_number: usize,
  /// The day record was created by this event.
  pub created:        bool,
  pub record:         DayRecord,
  pub subject:        Subject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordHours {
  #[serde(flatten)]
  pub record:       DayRecord,
  pub hours_worked: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySummary {
  pub date:          NaiveDate,
  pub records:       Vec<RecordHours>,
  pub total_records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceView {
  pub subject_id: Uuid,
  pub date:       NaiveDate,
  pub presence:   Presence,
  /// Entry time of the open session when `presence` is `in`.
  pub since:      Option<DateTime<FixedOffset>>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct AttendanceService<S, N> {
  store:    Arc<S>,
  notifier: Arc<N>,
  policy:   AttendancePolicy,
}

impl<S, N> AttendanceService<S, N> {
  pub fn new(store: Arc<S>, notifier: Arc<N>, policy: AttendancePolicy) -> Self {
    Self { store, notifier, policy }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn notifier(&self) -> &N { &self.notifier }

  pub fn policy(&self) -> &AttendancePolicy { &self.policy }
}

impl<S, N> AttendanceService<S, N>
where
  S: AttendanceStore,
  N: Notifier,
{
  // ── Recording ─────────────────────────────────────────────────────────

  /// Record a tag scan. `raw_timestamp` is local wall-clock time as sent by
  /// the terminal; absent or malformed values mean "now".
  pub async fn record_event(
    &self,
    tag: &str,
    raw_timestamp: Option<&str>,
  ) -> ServiceResult<Recorded, S::Error> {
    let at = self.policy.clock.normalize(raw_timestamp);
    let subject = self
      .store
      .find_subject_by_tag(tag)
      .await
      .map_err(ServiceError::Store)?
      .ok_or_else(|| ServiceError::UnknownTag(tag.to_owned()))?;
    self.record_for(subject, at).await
  }

  /// Record an operator-entered event for a subject identified by id.
  pub async fn record_manual(
    &self,
    subject_id: Uuid,
    raw_timestamp: Option<&str>,
  ) -> ServiceResult<Recorded, S::Error> {
    let at = self.policy.clock.normalize(raw_timestamp);
    let subject = self.get_subject(subject_id).await?;
    self.record_for(subject, at).await
  }

  async fn record_for(
    &self,
    subject: Subject,
    at: DateTime<FixedOffset>,
  ) -> ServiceResult<Recorded, S::Error> {
    if !subject.active {
      return Err(ServiceError::Inactive(Box::new(subject)));
    }

    let toggle = self
      .store
      .toggle_session(subject.subject_id, at)
      .await
      .map_err(ServiceError::Store)?;

    info!(
      subject_id = %subject.subject_id,
      kind = ?toggle.kind,
      session = toggle.session_number,
      at = %at,
      "attendance recorded"
    );

    Ok(Recorded {
      kind: toggle.kind,
      session_number: toggle.session_number,
      created: toggle.created,
      record: toggle.record,
      subject,
    })
  }

  /// Set the coarse status label on a subject's day, creating a session-less
  /// record if there is none. Sessions are left untouched.
  pub async fn mark_status(
    &self,
    subject_id: Uuid,
    date: NaiveDate,
    status: AttendanceStatus,
  ) -> ServiceResult<DayRecord, S::Error> {
    self.get_subject(subject_id).await?;

    let existing = self
      .store
      .find_day_record(subject_id, date)
      .await
      .map_err(ServiceError::Store)?;

    let saved = match existing {
      Some(mut record) => {
        record.status = Some(status);
        record.updated_at = Utc::now();
        self.store.update_day_record(record).await
      }
      None => {
        let mut record = DayRecord::new(subject_id, date, Utc::now());
        record.status = Some(status);
        self.store.create_day_record(record).await
      }
    }
    .map_err(ServiceError::Store)?;

    info!(%subject_id, %date, %status, "attendance status set");
    Ok(saved)
  }

  // ── Records ───────────────────────────────────────────────────────────

  pub async fn get_record(&self, id: Uuid) -> ServiceResult<DayRecord, S::Error> {
    self
      .store
      .get_day_record(id)
      .await
      .map_err(ServiceError::Store)?
      .ok_or(ServiceError::RecordNotFound(id))
  }

  /// Administrative deletion.
  pub async fn delete_record(&self, id: Uuid) -> ServiceResult<(), S::Error> {
    let deleted = self
      .store
      .delete_day_record(id)
      .await
      .map_err(ServiceError::Store)?;
    if !deleted {
      return Err(ServiceError::RecordNotFound(id));
    }
    info!(record_id = %id, "attendance record deleted");
    Ok(())
  }

  /// Every record of `date` (default today) with its hours.
  pub async fn day_summary(
    &self,
    date: Option<NaiveDate>,
  ) -> ServiceResult<DaySummary, S::Error> {
    let date = date.unwrap_or_else(|| self.policy.clock.today());
    let records = self
      .store
      .list_records_for_date(date)
      .await
      .map_err(ServiceError::Store)?;

    let records: Vec<RecordHours> = records
      .into_iter()
      .map(|record| RecordHours {
        hours_worked: round_hours(record.hours_worked()),
        record,
      })
      .collect();

    Ok(DaySummary { date, total_records: records.len(), records })
  }

  /// Current status of a subject, computed from the day's sessions.
  pub async fn presence(
    &self,
    subject_id: Uuid,
    date: Option<NaiveDate>,
  ) -> ServiceResult<PresenceView, S::Error> {
    self.get_subject(subject_id).await?;
    let date = date.unwrap_or_else(|| self.policy.clock.today());

    let record = self
      .store
      .find_day_record(subject_id, date)
      .await
      .map_err(ServiceError::Store)?;

    let (presence, since) = match &record {
      Some(r) => (r.presence(), r.open_session().map(|(_, s)| s.entry_time)),
      None => (Presence::Absent, None),
    };

    Ok(PresenceView { subject_id, date, presence, since })
  }

  pub async fn stats(
    &self,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
  ) -> ServiceResult<AttendanceStats, S::Error> {
    self
      .stats_for(SubjectFilter::excluding(Role::Admin), start_date, end_date)
      .await
  }

  /// As [`stats`](Self::stats), restricted to one school's members.
  pub async fn school_stats(
    &self,
    school_id: Uuid,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
  ) -> ServiceResult<AttendanceStats, S::Error> {
    self.get_school(school_id).await?;
    let filter = SubjectFilter {
      school_id: Some(school_id),
      ..SubjectFilter::excluding(Role::Admin)
    };
    self.stats_for(filter, start_date, end_date).await
  }

  async fn stats_for(
    &self,
    filter: SubjectFilter,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
  ) -> ServiceResult<AttendanceStats, S::Error> {
    let roster = self
      .store
      .list_subjects(&filter)
      .await
      .map_err(ServiceError::Store)?;
    let query = RecordQuery { start_date, end_date, ..Default::default() };
    let records = self
      .store
      .list_records(&query)
      .await
      .map_err(ServiceError::Store)?;
    Ok(stats::compute(&roster, &records, start_date, end_date))
  }

  /// Headcounts across every subject and school, with today's attendance.
  pub async fn overview(&self) -> ServiceResult<Overview, S::Error> {
    let today = self.policy.clock.today();
    let subjects = self
      .store
      .list_subjects(&SubjectFilter::default())
      .await
      .map_err(ServiceError::Store)?;
    let schools = self.store.list_schools().await.map_err(ServiceError::Store)?;

    let today_query =
      RecordQuery { start_date: Some(today), end_date: Some(today), ..Default::default() };
    let today_attendance = self
      .store
      .count_records(&today_query)
      .await
      .map_err(ServiceError::Store)?;
    let total_records = self
      .store
      .count_records(&RecordQuery::default())
      .await
      .map_err(ServiceError::Store)?;

    Ok(stats::overview(&subjects, &schools, today, today_attendance, total_records))
  }

  // ── Housekeeping ──────────────────────────────────────────────────────

  /// Discard today's open sessions once the cutoff has passed.
  ///
  /// Subjects who lose sessions are notified. Notification failures are
  /// logged and do not abort the run.
  pub async fn run_auto_close(
    &self,
    now: DateTime<Utc>,
  ) -> ServiceResult<AutoCloseOutcome, S::Error> {
    let local_now = self.policy.clock.localize(now);
    let date = local_now.date_naive();

    if !autoclose::is_due(local_now, self.policy.cutoff) {
      let cutoff = self.policy.clock.at(date, self.policy.cutoff);
      info!(%cutoff, "auto-close not yet due");
      return Ok(AutoCloseOutcome::NotYetDue { cutoff });
    }

    let candidates = self
      .store
      .list_open_records_for_date(date)
      .await
      .map_err(ServiceError::Store)?;

    let mut summary = AutoCloseSummary {
      date,
      updated_records: 0,
      discarded_sessions: 0,
      deleted_records: 0,
    };

    for candidate in candidates {
      let cleanup = match self
        .store
        .discard_open_sessions(candidate.record_id, now)
        .await
        .map_err(ServiceError::Store)?
      {
        Some(Cleanup::Untouched) | None => continue,
        Some(cleanup) => cleanup,
      };

      summary.updated_records += 1;
      summary.discarded_sessions += cleanup.discarded().len();
      if matches!(cleanup, Cleanup::Emptied { .. }) {
        summary.deleted_records += 1;
      }

      self
        .notify_incomplete(candidate.subject_id, cleanup.discarded(), date)
        .await?;
    }

    info!(
      %date,
      updated = summary.updated_records,
      discarded = summary.discarded_sessions,
      deleted = summary.deleted_records,
      "auto-close completed"
    );
    Ok(AutoCloseOutcome::Completed(summary))
  }

  async fn notify_incomplete(
    &self,
    subject_id: Uuid,
    discarded: &[crate::record::Session],
    date: NaiveDate,
  ) -> ServiceResult<(), S::Error> {
    let subject = self
      .store
      .get_subject(subject_id)
      .await
      .map_err(ServiceError::Store)?;

    let Some(subject) = subject.filter(|s| s.email.is_some()) else {
      return Ok(());
    };

    if let Err(e) = self
      .notifier
      .notify_subject_incomplete_sessions(&subject, discarded, date)
      .await
    {
      warn!(%subject_id, error = %e, "failed to send incomplete-session notice");
    }
    Ok(())
  }

  /// Flag roster subjects under the threshold on `date` (default today),
  /// notify each one that has an email, and send the operator summary.
  pub async fn evaluate_low_attendance(
    &self,
    date: Option<NaiveDate>,
  ) -> ServiceResult<LowAttendanceReport, S::Error> {
    let date = date.unwrap_or_else(|| self.policy.clock.today());
    let roster = self.roster().await?;
    let records = self
      .store
      .list_records_for_date(date)
      .await
      .map_err(ServiceError::Store)?;

    let flagged = evaluate::flag_low_attendance(
      &roster,
      &records,
      self.policy.low_attendance_hours,
    );

    let mut notified = 0;
    for f in flagged.iter().filter(|f| f.subject.email.is_some()) {
      match self
        .notifier
        .notify_subject_low_attendance(&f.subject, f.hours_worked, date)
        .await
      {
        Ok(()) => notified += 1,
        Err(e) => warn!(
          subject_id = %f.subject.subject_id,
          error = %e,
          "failed to send low-attendance notice"
        ),
      }
    }

    if let Err(e) = self
      .notifier
      .notify_operators_low_attendance_summary(&flagged, date)
      .await
    {
      warn!(error = %e, "failed to send low-attendance summary");
    }

    info!(%date, flagged = flagged.len(), notified, "low-attendance check completed");
    Ok(LowAttendanceReport {
      date,
      total_users: roster.len(),
      flagged,
      notified,
    })
  }

  async fn roster(&self) -> ServiceResult<Vec<Subject>, S::Error> {
    self
      .store
      .list_subjects(&SubjectFilter::excluding(Role::Admin))
      .await
      .map_err(ServiceError::Store)
  }

  // ── Subjects ──────────────────────────────────────────────────────────

  pub async fn get_subject(&self, id: Uuid) -> ServiceResult<Subject, S::Error> {
    self
      .store
      .get_subject(id)
      .await
      .map_err(ServiceError::Store)?
      .ok_or(ServiceError::SubjectNotFound(id))
  }

  pub async fn create_subject(
    &self,
    input: NewSubject,
  ) -> ServiceResult<Subject, S::Error> {
    self.ensure_tag_free(&input.rfid_tag, None).await?;
    if let Some(school_id) = input.school_id {
      self.get_school(school_id).await?;
    }
    let subject = self.store.add_subject(input).await.map_err(ServiceError::Store)?;
    info!(subject_id = %subject.subject_id, role = %subject.role, "subject created");
    Ok(subject)
  }

  pub async fn update_subject(
    &self,
    id: Uuid,
    patch: SubjectPatch,
  ) -> ServiceResult<Subject, S::Error> {
    if let Some(tag) = &patch.rfid_tag {
      self.ensure_tag_free(tag, Some(id)).await?;
    }
    if let Some(Some(school_id)) = patch.school_id {
      self.get_school(school_id).await?;
    }
    self
      .store
      .update_subject(id, patch)
      .await
      .map_err(ServiceError::Store)?
      .ok_or(ServiceError::SubjectNotFound(id))
  }

  /// Refused while any day record still references the subject.
  pub async fn delete_subject(&self, id: Uuid) -> ServiceResult<(), S::Error> {
    let query = RecordQuery { subject_id: Some(id), limit: Some(1), ..Default::default() };
    let referenced = !self
      .store
      .list_records(&query)
      .await
      .map_err(ServiceError::Store)?
      .is_empty();
    if referenced {
      return Err(ServiceError::Conflict(format!(
        "subject {id} still has attendance records"
      )));
    }

    if !self.store.delete_subject(id).await.map_err(ServiceError::Store)? {
      return Err(ServiceError::SubjectNotFound(id));
    }
    Ok(())
  }

  async fn ensure_tag_free(
    &self,
    tag: &str,
    owner: Option<Uuid>,
  ) -> ServiceResult<(), S::Error> {
    let holder = self
      .store
      .find_subject_by_tag(tag)
      .await
      .map_err(ServiceError::Store)?;
    match holder {
      Some(s) if Some(s.subject_id) != owner => Err(ServiceError::Conflict(
        format!("tag {tag:?} is already assigned"),
      )),
      _ => Ok(()),
    }
  }

  // ── Schools ───────────────────────────────────────────────────────────

  pub async fn get_school(&self, id: Uuid) -> ServiceResult<School, S::Error> {
    self
      .store
      .get_school(id)
      .await
      .map_err(ServiceError::Store)?
      .ok_or(ServiceError::SchoolNotFound(id))
  }

  pub async fn create_school(&self, input: NewSchool) -> ServiceResult<School, S::Error> {
    self.store.add_school(input).await.map_err(ServiceError::Store)
  }

  pub async fn update_school(
    &self,
    id: Uuid,
    patch: SchoolPatch,
  ) -> ServiceResult<School, S::Error> {
    self
      .store
      .update_school(id, patch)
      .await
      .map_err(ServiceError::Store)?
      .ok_or(ServiceError::SchoolNotFound(id))
  }

  pub async fn delete_school(&self, id: Uuid) -> ServiceResult<(), S::Error> {
    if !self.store.delete_school(id).await.map_err(ServiceError::Store)? {
      return Err(ServiceError::SchoolNotFound(id));
    }
    Ok(())
  }
}
