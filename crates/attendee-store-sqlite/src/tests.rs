//! Integration tests for `SqliteStore` against an in-memory database, plus
//! end-to-end runs of `AttendanceService` on top of it.

use std::{convert::Infallible, sync::Arc, sync::Mutex};

use attendee_core::{
  ServiceError,
  autoclose::{AutoCloseOutcome, Cleanup},
  evaluate::Flagged,
  notify::Notifier,
  record::{AttendanceStatus, EventKind, Presence, Session},
  school::NewSchool,
  service::{AttendancePolicy, AttendanceService},
  store::{AttendanceStore, RecordQuery, SubjectFilter},
  subject::{NewSubject, Role, Subject, SubjectPatch},
};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone as _, Utc};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn ist() -> FixedOffset { FixedOffset::east_opt(19_800).unwrap() }

fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
  ist().with_ymd_and_hms(2025, 1, 10, h, m, 0).unwrap()
}

fn day() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 1, 10).unwrap() }

fn new_subject(name: &str, role: Role, email: Option<&str>) -> NewSubject {
  NewSubject {
    name:      name.into(),
    email:     email.map(str::to_owned),
    role,
    rfid_tag:  format!("tag-{name}"),
    school_id: None,
  }
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_find_subject_by_tag() {
  let s = store().await;
  let subject = s
    .add_subject(new_subject("asha", Role::Student, Some("asha@example.org")))
    .await
    .unwrap();
  assert!(subject.active);

  let fetched = s.find_subject_by_tag("tag-asha").await.unwrap().unwrap();
  assert_eq!(fetched, subject);
  assert!(s.find_subject_by_tag("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_tag_is_rejected() {
  let s = store().await;
  s.add_subject(new_subject("a", Role::Student, None)).await.unwrap();
  let mut dup = new_subject("b", Role::Student, None);
  dup.rfid_tag = "tag-a".into();
  assert!(s.add_subject(dup).await.is_err());
}

#[tokio::test]
async fn list_subjects_filters() {
  let s = store().await;
  s.add_subject(new_subject("a", Role::Student, None)).await.unwrap();
  s.add_subject(new_subject("b", Role::Teacher, None)).await.unwrap();
  s.add_subject(new_subject("c", Role::Admin, None)).await.unwrap();

  let roster = s.list_subjects(&SubjectFilter::excluding(Role::Admin)).await.unwrap();
  assert_eq!(roster.len(), 2);
  assert!(roster.iter().all(|r| r.role != Role::Admin));

  let teachers = s
    .list_subjects(&SubjectFilter { role: Some(Role::Teacher), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(teachers.len(), 1);
  assert_eq!(teachers[0].name, "b");
}

#[tokio::test]
async fn update_subject_applies_patch() {
  let s = store().await;
  let subject = s.add_subject(new_subject("a", Role::Student, None)).await.unwrap();

  let updated = s
    .update_subject(subject.subject_id, SubjectPatch {
      active: Some(false),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert!(!updated.active);

  let inactive = s
    .list_subjects(&SubjectFilter { active: Some(false), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(inactive.len(), 1);

  assert!(
    s.update_subject(Uuid::new_v4(), SubjectPatch::default())
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn deleting_school_unaffiliates_subjects() {
  let s = store().await;
  let school = s
    .add_school(NewSchool { name: "GHS".into(), district: None, state: None })
    .await
    .unwrap();
  let mut input = new_subject("a", Role::Teacher, None);
  input.school_id = Some(school.school_id);
  let subject = s.add_subject(input).await.unwrap();

  assert!(s.delete_school(school.school_id).await.unwrap());
  let fetched = s.get_subject(subject.subject_id).await.unwrap().unwrap();
  assert_eq!(fetched.school_id, None);
  assert!(!s.delete_school(school.school_id).await.unwrap());
}

// ─── Session ledger ──────────────────────────────────────────────────────────

#[tokio::test]
async fn toggle_alternates_entry_and_exit() {
  let s = store().await;
  let subject = s.add_subject(new_subject("a", Role::Student, None)).await.unwrap();
  let id = subject.subject_id;

  let first = s.toggle_session(id, at(9, 0)).await.unwrap();
  assert!(first.created);
  assert_eq!((first.kind, first.session_number), (EventKind::Entry, 1));

  let second = s.toggle_session(id, at(12, 0)).await.unwrap();
  assert!(!second.created);
  assert_eq!((second.kind, second.session_number), (EventKind::Exit, 1));

  let third = s.toggle_session(id, at(14, 0)).await.unwrap();
  assert_eq!((third.kind, third.session_number), (EventKind::Entry, 2));

  let stored = s.find_day_record(id, day()).await.unwrap().unwrap();
  assert_eq!(stored.record_id, first.record.record_id);
  assert_eq!(stored.sessions.len(), 2);
  assert_eq!(stored.entry_time, Some(at(9, 0)));
  assert_eq!(stored.exit_time, Some(at(12, 0)));
  assert_eq!(stored.presence(), Presence::In);
}

#[tokio::test]
async fn concurrent_scans_never_lose_an_event() {
  let s = Arc::new(store().await);
  let subject = s.add_subject(new_subject("a", Role::Student, None)).await.unwrap();

  let handles: Vec<_> = (0..10)
    .map(|i| {
      let s = Arc::clone(&s);
      let id = subject.subject_id;
      tokio::spawn(async move { s.toggle_session(id, at(9, i)).await })
    })
    .collect();
  for h in handles {
    h.await.unwrap().unwrap();
  }

  let record = s.find_day_record(subject.subject_id, day()).await.unwrap().unwrap();
  assert_eq!(record.sessions.len(), 5);
  assert!(!record.has_open_session());
}

#[tokio::test]
async fn discard_trims_or_deletes() {
  let s = store().await;
  let a = s.add_subject(new_subject("a", Role::Student, None)).await.unwrap();
  let b = s.add_subject(new_subject("b", Role::Student, None)).await.unwrap();

  for t in [at(9, 0), at(10, 0), at(15, 0)] {
    s.toggle_session(a.subject_id, t).await.unwrap();
  }
  let only_open = s.toggle_session(b.subject_id, at(11, 0)).await.unwrap();

  let open = s.list_open_records_for_date(day()).await.unwrap();
  assert_eq!(open.len(), 2);

  let a_record = s.find_day_record(a.subject_id, day()).await.unwrap().unwrap();
  let cleanup = s
    .discard_open_sessions(a_record.record_id, Utc::now())
    .await
    .unwrap()
    .unwrap();
  assert!(matches!(cleanup, Cleanup::Trimmed { .. }));
  let a_record = s.get_day_record(a_record.record_id).await.unwrap().unwrap();
  assert_eq!(a_record.sessions.len(), 1);
  assert!(!a_record.has_open_session());

  let cleanup = s
    .discard_open_sessions(only_open.record.record_id, Utc::now())
    .await
    .unwrap()
    .unwrap();
  assert!(matches!(cleanup, Cleanup::Emptied { .. }));
  assert!(s.get_day_record(only_open.record.record_id).await.unwrap().is_none());
  assert!(
    s.discard_open_sessions(only_open.record.record_id, Utc::now())
      .await
      .unwrap()
      .is_none()
  );

  assert!(s.list_open_records_for_date(day()).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_records_respects_range_and_limit() {
  let s = store().await;
  let a = s.add_subject(new_subject("a", Role::Student, None)).await.unwrap();
  for d in 8..=12 {
    let when = ist().with_ymd_and_hms(2025, 1, d, 9, 0, 0).unwrap();
    s.toggle_session(a.subject_id, when).await.unwrap();
  }

  let query = RecordQuery {
    start_date: NaiveDate::from_ymd_opt(2025, 1, 9),
    end_date: NaiveDate::from_ymd_opt(2025, 1, 11),
    ..Default::default()
  };
  let records = s.list_records(&query).await.unwrap();
  let dates: Vec<u32> = records.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
  assert_eq!(dates, vec![11, 10, 9]);

  let page = s
    .list_records(&RecordQuery { limit: Some(2), offset: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.len(), 2);
  assert_eq!(chrono::Datelike::day(&page[0].date), 11);
}

#[tokio::test]
async fn count_records_ignores_paging() {
  let s = store().await;
  let a = s.add_subject(new_subject("a", Role::Student, None)).await.unwrap();
  for d in 8..=12 {
    let when = ist().with_ymd_and_hms(2025, 1, d, 9, 0, 0).unwrap();
    s.toggle_session(a.subject_id, when).await.unwrap();
  }

  let query = RecordQuery {
    start_date: NaiveDate::from_ymd_opt(2025, 1, 10),
    limit: Some(1),
    ..Default::default()
  };
  assert_eq!(s.count_records(&query).await.unwrap(), 3);
  assert_eq!(s.count_records(&RecordQuery::default()).await.unwrap(), 5);
}

// ─── Service ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingNotifier {
  sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
  fn sent(&self) -> Vec<String> { self.sent.lock().unwrap().clone() }
}

impl Notifier for RecordingNotifier {
  type Error = Infallible;

  async fn notify_subject_incomplete_sessions(
    &self,
    subject: &Subject,
    discarded: &[Session],
    _date: NaiveDate,
  ) -> Result<(), Infallible> {
    self
      .sent
      .lock()
      .unwrap()
      .push(format!("incomplete:{}:{}", subject.name, discarded.len()));
    Ok(())
  }

  async fn notify_subject_low_attendance(
    &self,
    subject: &Subject,
    hours_worked: f64,
    _date: NaiveDate,
  ) -> Result<(), Infallible> {
    self
      .sent
      .lock()
      .unwrap()
      .push(format!("low:{}:{hours_worked:.2}", subject.name));
    Ok(())
  }

  async fn notify_operators_low_attendance_summary(
    &self,
    flagged: &[Flagged],
    _date: NaiveDate,
  ) -> Result<(), Infallible> {
    self.sent.lock().unwrap().push(format!("summary:{}", flagged.len()));
    Ok(())
  }
}

type Service = AttendanceService<SqliteStore, RecordingNotifier>;

async fn service() -> Service {
  AttendanceService::new(
    Arc::new(store().await),
    Arc::new(RecordingNotifier::default()),
    AttendancePolicy::default(),
  )
}

#[tokio::test]
async fn scans_build_multi_session_day() {
  let svc = service().await;
  let subject = svc
    .create_subject(new_subject("ravi", Role::Teacher, None))
    .await
    .unwrap();

  let r = svc.record_event("tag-ravi", Some("2025-01-10T09:00:00")).await.unwrap();
  assert_eq!((r.kind, r.session_number, r.created), (EventKind::Entry, 1, true));
  svc.record_event("tag-ravi", Some("2025-01-10T12:00:00")).await.unwrap();
  svc.record_event("tag-ravi", Some("2025-01-10T14:00:00")).await.unwrap();
  let r = svc.record_event("tag-ravi", Some("2025-01-10T17:30:00")).await.unwrap();
  assert_eq!((r.kind, r.session_number), (EventKind::Exit, 2));

  let summary = svc.day_summary(Some(day())).await.unwrap();
  assert_eq!(summary.total_records, 1);
  assert_eq!(summary.records[0].hours_worked, 6.5);

  let presence = svc.presence(subject.subject_id, Some(day())).await.unwrap();
  assert_eq!(presence.presence, Presence::Out);
  assert_eq!(presence.since, None);
}

#[tokio::test]
async fn unknown_and_inactive_tags_write_nothing() {
  let svc = service().await;
  let err = svc.record_event("ghost", None).await.unwrap_err();
  assert!(matches!(err, ServiceError::UnknownTag(t) if t == "ghost"));

  let subject = svc
    .create_subject(new_subject("gone", Role::Student, None))
    .await
    .unwrap();
  svc
    .update_subject(subject.subject_id, SubjectPatch {
      active: Some(false),
      ..Default::default()
    })
    .await
    .unwrap();

  let err = svc
    .record_event("tag-gone", Some("2025-01-10T09:00:00"))
    .await
    .unwrap_err();
  assert!(matches!(err, ServiceError::Inactive(_)));
  assert!(svc.day_summary(Some(day())).await.unwrap().records.is_empty());
}

#[tokio::test]
async fn malformed_timestamp_falls_back_to_now() {
  let svc = service().await;
  svc.create_subject(new_subject("a", Role::Student, None)).await.unwrap();
  let r = svc.record_event("tag-a", Some("yesterday-ish")).await.unwrap();
  assert_eq!(r.record.date, svc.policy().clock.today());
}

#[tokio::test]
async fn auto_close_waits_for_cutoff() {
  let svc = service().await;
  svc.create_subject(new_subject("a", Role::Student, None)).await.unwrap();
  svc.record_event("tag-a", Some("2025-01-10T09:00:00")).await.unwrap();

  // 15:30 local.
  let early = Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap();
  let outcome = svc.run_auto_close(early).await.unwrap();
  assert_eq!(outcome, AutoCloseOutcome::NotYetDue { cutoff: at(22, 0) });
  assert_eq!(svc.store().list_open_records_for_date(day()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn auto_close_discards_and_notifies() {
  let svc = service().await;
  svc
    .create_subject(new_subject("kept", Role::Teacher, Some("k@example.org")))
    .await
    .unwrap();
  svc.create_subject(new_subject("quiet", Role::Student, None)).await.unwrap();
  for ts in ["2025-01-10T09:00:00", "2025-01-10T12:00:00", "2025-01-10T14:00:00"] {
    svc.record_event("tag-kept", Some(ts)).await.unwrap();
  }
  svc.record_event("tag-quiet", Some("2025-01-10T10:00:00")).await.unwrap();

  // 22:30 local.
  let late = Utc.with_ymd_and_hms(2025, 1, 10, 17, 0, 0).unwrap();
  let AutoCloseOutcome::Completed(summary) = svc.run_auto_close(late).await.unwrap()
  else {
    panic!("expected a completed run");
  };
  assert_eq!(summary.updated_records, 2);
  assert_eq!(summary.discarded_sessions, 2);
  assert_eq!(summary.deleted_records, 1);
  assert_eq!(svc.notifier().sent(), vec!["incomplete:kept:1".to_string()]);

  let day_records = svc.day_summary(Some(day())).await.unwrap();
  assert_eq!(day_records.total_records, 1);
  assert_eq!(day_records.records[0].hours_worked, 3.0);

  // A second run finds nothing left to do.
  let AutoCloseOutcome::Completed(again) = svc.run_auto_close(late).await.unwrap() else {
    panic!("expected a completed run");
  };
  assert_eq!(again.updated_records, 0);
}

#[tokio::test]
async fn low_attendance_flags_and_notifies() {
  let svc = service().await;
  svc
    .create_subject(new_subject("busy", Role::Teacher, Some("b@example.org")))
    .await
    .unwrap();
  svc
    .create_subject(new_subject("brief", Role::Student, Some("s@example.org")))
    .await
    .unwrap();
  svc.create_subject(new_subject("absent", Role::Student, None)).await.unwrap();
  svc.create_subject(new_subject("root", Role::Admin, None)).await.unwrap();

  for ts in ["2025-01-10T09:00:00", "2025-01-10T13:00:00"] {
    svc.record_event("tag-busy", Some(ts)).await.unwrap();
  }
  for ts in ["2025-01-10T09:00:00", "2025-01-10T10:30:00"] {
    svc.record_event("tag-brief", Some(ts)).await.unwrap();
  }

  let report = svc.evaluate_low_attendance(Some(day())).await.unwrap();
  assert_eq!(report.total_users, 3);
  let names: Vec<&str> = report.flagged.iter().map(|f| f.subject.name.as_str()).collect();
  assert_eq!(names, vec!["absent", "brief"]);
  assert_eq!(report.notified, 1);
  assert_eq!(svc.notifier().sent(), vec![
    "low:brief:1.50".to_string(),
    "summary:2".to_string(),
  ]);
}

#[tokio::test]
async fn status_label_coexists_with_sessions() {
  let svc = service().await;
  let subject = svc.create_subject(new_subject("a", Role::Student, None)).await.unwrap();

  let record = svc
    .mark_status(subject.subject_id, day(), AttendanceStatus::Excused)
    .await
    .unwrap();
  assert!(record.sessions.is_empty());
  assert_eq!(
    svc.presence(subject.subject_id, Some(day())).await.unwrap().presence,
    Presence::Absent
  );

  let r = svc.record_event("tag-a", Some("2025-01-10T09:00:00")).await.unwrap();
  assert!(!r.created);
  assert_eq!(r.record.record_id, record.record_id);
  assert_eq!(r.record.status, Some(AttendanceStatus::Excused));
}

#[tokio::test]
async fn auto_close_keeps_labelled_record() {
  let svc = service().await;
  let subject = svc.create_subject(new_subject("a", Role::Student, None)).await.unwrap();
  let labelled = svc
    .mark_status(subject.subject_id, day(), AttendanceStatus::Late)
    .await
    .unwrap();
  svc.record_event("tag-a", Some("2025-01-10T09:00:00")).await.unwrap();

  // 22:30 local.
  let late = Utc.with_ymd_and_hms(2025, 1, 10, 17, 0, 0).unwrap();
  let AutoCloseOutcome::Completed(summary) = svc.run_auto_close(late).await.unwrap()
  else {
    panic!("expected a completed run");
  };
  assert_eq!(summary.updated_records, 1);
  assert_eq!(summary.discarded_sessions, 1);
  assert_eq!(summary.deleted_records, 0);

  let record = svc.get_record(labelled.record_id).await.unwrap();
  assert!(record.sessions.is_empty());
  assert_eq!(record.status, Some(AttendanceStatus::Late));
  assert_eq!(record.entry_time, None);
  assert!(svc.store().list_open_records_for_date(day()).await.unwrap().is_empty());
}

#[tokio::test]
async fn subject_guards() {
  let svc = service().await;
  let a = svc.create_subject(new_subject("a", Role::Student, None)).await.unwrap();
  let b = svc.create_subject(new_subject("b", Role::Student, None)).await.unwrap();

  let err = svc.create_subject(new_subject("a", Role::Teacher, None)).await.unwrap_err();
  assert!(matches!(err, ServiceError::Conflict(_)));

  let err = svc
    .update_subject(b.subject_id, SubjectPatch {
      rfid_tag: Some("tag-a".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, ServiceError::Conflict(_)));

  // Re-asserting one's own tag is fine.
  svc
    .update_subject(a.subject_id, SubjectPatch {
      rfid_tag: Some("tag-a".into()),
      ..Default::default()
    })
    .await
    .unwrap();

  svc.record_event("tag-a", Some("2025-01-10T09:00:00")).await.unwrap();
  let err = svc.delete_subject(a.subject_id).await.unwrap_err();
  assert!(matches!(err, ServiceError::Conflict(_)));

  svc.delete_subject(b.subject_id).await.unwrap();
  let err = svc.delete_subject(b.subject_id).await.unwrap_err();
  assert!(matches!(err, ServiceError::SubjectNotFound(_)));
}

#[tokio::test]
async fn stats_cover_range() {
  let svc = service().await;
  svc.create_subject(new_subject("a", Role::Student, None)).await.unwrap();
  svc.create_subject(new_subject("b", Role::Student, None)).await.unwrap();
  svc.record_event("tag-a", Some("2025-01-09T09:00:00")).await.unwrap();
  svc.record_event("tag-a", Some("2025-01-10T09:00:00")).await.unwrap();

  let stats = svc.stats(Some(day()), Some(day())).await.unwrap();
  assert_eq!(stats.overall.total_users, 2);
  assert_eq!(stats.overall.present_users, 1);
  assert_eq!(stats.overall.total_records, 1);
  assert_eq!(stats.overall.attendance_rate, 50.0);
}

#[tokio::test]
async fn school_stats_only_count_members() {
  let svc = service().await;
  let school = svc
    .create_school(NewSchool { name: "GHS".into(), district: None, state: None })
    .await
    .unwrap();
  for name in ["in1", "in2"] {
    let mut input = new_subject(name, Role::Student, None);
    input.school_id = Some(school.school_id);
    svc.create_subject(input).await.unwrap();
  }
  svc.create_subject(new_subject("elsewhere", Role::Student, None)).await.unwrap();
  svc.record_event("tag-in1", Some("2025-01-10T09:00:00")).await.unwrap();
  svc.record_event("tag-elsewhere", Some("2025-01-10T09:00:00")).await.unwrap();

  let stats = svc.school_stats(school.school_id, None, None).await.unwrap();
  assert_eq!(stats.overall.total_users, 2);
  assert_eq!(stats.overall.present_users, 1);
  assert_eq!(stats.overall.total_records, 1);
  assert_eq!(stats.overall.attendance_rate, 50.0);

  let err = svc.school_stats(Uuid::new_v4(), None, None).await.unwrap_err();
  assert!(matches!(err, ServiceError::SchoolNotFound(_)));
}

#[tokio::test]
async fn overview_counts_today() {
  let svc = service().await;
  svc
    .create_school(NewSchool { name: "GHS".into(), district: Some("Pune".into()), state: None })
    .await
    .unwrap();
  let a = svc.create_subject(new_subject("a", Role::Student, None)).await.unwrap();
  svc.create_subject(new_subject("root", Role::Admin, None)).await.unwrap();
  svc
    .update_subject(a.subject_id, SubjectPatch { active: Some(false), ..Default::default() })
    .await
    .unwrap();
  svc.create_subject(new_subject("b", Role::Teacher, None)).await.unwrap();
  svc.record_event("tag-b", None).await.unwrap();
  svc.record_event("tag-b", Some("2025-01-10T09:00:00")).await.unwrap();

  let o = svc.overview().await.unwrap();
  assert_eq!((o.total_users, o.active_users, o.inactive_users), (3, 2, 1));
  assert_eq!(o.users_by_role[&Role::Admin], 1);
  assert_eq!(o.schools_by_district["Pune"], 1);
  assert_eq!(o.today_attendance, 1);
  assert_eq!(o.total_records, 2);
  assert_eq!(o.date, svc.policy().clock.today());
}

// ─── Notifier failures ───────────────────────────────────────────────────────

/// Refuses every notice.
struct FailingNotifier;

impl Notifier for FailingNotifier {
  type Error = std::io::Error;

  async fn notify_subject_incomplete_sessions(
    &self,
    _: &Subject,
    _: &[Session],
    _: NaiveDate,
  ) -> Result<(), std::io::Error> {
    Err(std::io::Error::other("mail relay down"))
  }

  async fn notify_subject_low_attendance(
    &self,
    _: &Subject,
    _: f64,
    _: NaiveDate,
  ) -> Result<(), std::io::Error> {
    Err(std::io::Error::other("mail relay down"))
  }

  async fn notify_operators_low_attendance_summary(
    &self,
    _: &[Flagged],
    _: NaiveDate,
  ) -> Result<(), std::io::Error> {
    Err(std::io::Error::other("mail relay down"))
  }
}

async fn failing_service() -> AttendanceService<SqliteStore, FailingNotifier> {
  AttendanceService::new(
    Arc::new(store().await),
    Arc::new(FailingNotifier),
    AttendancePolicy::default(),
  )
}

#[tokio::test]
async fn auto_close_survives_notifier_failure() {
  let svc = failing_service().await;
  for name in ["a", "b"] {
    let email = format!("{name}@example.org");
    svc
      .create_subject(new_subject(name, Role::Student, Some(&email)))
      .await
      .unwrap();
  }
  for ts in ["2025-01-10T09:00:00", "2025-01-10T11:00:00", "2025-01-10T13:00:00"] {
    svc.record_event("tag-a", Some(ts)).await.unwrap();
  }
  svc.record_event("tag-b", Some("2025-01-10T10:00:00")).await.unwrap();

  let late = Utc.with_ymd_and_hms(2025, 1, 10, 17, 0, 0).unwrap();
  let AutoCloseOutcome::Completed(summary) = svc.run_auto_close(late).await.unwrap()
  else {
    panic!("expected a completed run");
  };
  assert_eq!(summary.updated_records, 2);
  assert_eq!(summary.discarded_sessions, 2);
  assert_eq!(summary.deleted_records, 1);
  assert!(svc.store().list_open_records_for_date(day()).await.unwrap().is_empty());

  let remaining = svc.day_summary(Some(day())).await.unwrap();
  assert_eq!(remaining.total_records, 1);
  assert_eq!(remaining.records[0].hours_worked, 2.0);
}

#[tokio::test]
async fn low_attendance_counts_only_delivered_notices() {
  let svc = failing_service().await;
  svc
    .create_subject(new_subject("a", Role::Student, Some("a@example.org")))
    .await
    .unwrap();
  svc
    .create_subject(new_subject("b", Role::Teacher, Some("b@example.org")))
    .await
    .unwrap();

  let report = svc.evaluate_low_attendance(Some(day())).await.unwrap();
  assert_eq!(report.total_users, 2);
  assert_eq!(report.flagged.len(), 2);
  assert_eq!(report.notified, 0);
}
