//! The notification collaborator and the messages it carries.
//!
//! Delivery is up to the implementor; this module only fixes what gets said.
//! The `*_message` functions render plain-text messages so every transport
//! words them identically.

use std::future::Future;

use chrono::NaiveDate;

use crate::{evaluate::Flagged, record::Session, subject::Subject};

/// Sink for the notices the core emits.
///
/// Callers only invoke the per-subject methods for subjects that have an
/// email address. Failures are logged by the caller and never abort a run.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Tell a subject that housekeeping discarded sessions they never closed.
  fn notify_subject_incomplete_sessions<'a>(
    &'a self,
    subject: &'a Subject,
    discarded: &'a [Session],
    date: NaiveDate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Tell a subject that their hours on `date` fell below the threshold.
  fn notify_subject_low_attendance<'a>(
    &'a self,
    subject: &'a Subject,
    hours_worked: f64,
    date: NaiveDate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Send the operators the day's list of flagged subjects.
  fn notify_operators_low_attendance_summary<'a>(
    &'a self,
    flagged: &'a [Flagged],
    date: NaiveDate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// A rendered notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
  pub to:      Vec<String>,
  pub subject: String,
  pub body:    String,
}

const FOOTER: &str = "This is an automated message from the Attendee System.";

fn long_date(date: NaiveDate) -> String { date.format("%a %b %d %Y").to_string() }

/// `None` if the subject has no email address.
pub fn incomplete_sessions_message(
  subject: &Subject,
  discarded: &[Session],
  date: NaiveDate,
) -> Option<Message> {
  let email = subject.email.clone()?;
  let mut body = format!(
    "Dear {},\n\nYou have incomplete sessions that were automatically removed at the end of {}.\n\nRemoved sessions:\n",
    subject.name,
    long_date(date),
  );
  for session in discarded {
    body.push_str(&format!(
      "  - Entry {} (no exit time recorded)\n",
      session.entry_time.format("%H:%M:%S"),
    ));
  }
  body.push_str(
    "\nPlease remember to check out when leaving so your attendance is recorded accurately.\n\n",
  );
  body.push_str(FOOTER);

  Some(Message {
    to: vec![email],
    subject: format!("Incomplete Session Alert - {}", long_date(date)),
    body,
  })
}

/// `None` if the subject has no email address.
pub fn low_attendance_message(
  subject: &Subject,
  hours_worked: f64,
  threshold: f64,
  date: NaiveDate,
) -> Option<Message> {
  let email = subject.email.clone()?;
  let body = format!(
    "Dear {name},\n\nYour attendance for {date} was below the required {threshold:.2} hours.\n\n  Hours worked: {hours_worked:.2}\n  Required:     {threshold:.2}\n  Deficit:      {deficit:.2}\n\nPlease make sure you meet the minimum attendance requirement.\n\n{FOOTER}",
    name = subject.name,
    date = long_date(date),
    deficit = threshold - hours_worked,
  );

  Some(Message {
    to: vec![email],
    subject: format!("Low Attendance Alert - {}", long_date(date)),
    body,
  })
}

/// `None` if no operator addresses are configured.
pub fn low_attendance_summary_message(
  operators: &[String],
  flagged: &[Flagged],
  threshold: f64,
  date: NaiveDate,
) -> Option<Message> {
  if operators.is_empty() {
    return None;
  }

  let mut body = format!(
    "Date: {}\nSubjects with low attendance: {}\n\n",
    long_date(date),
    flagged.len(),
  );
  if flagged.is_empty() {
    body.push_str(&format!(
      "All subjects met the minimum {threshold:.2}-hour requirement.\n"
    ));
  } else {
    for f in flagged {
      body.push_str(&format!(
        "  - {} <{}>: {:.2} h worked, {:.2} h short\n",
        f.subject.name,
        f.subject.email.as_deref().unwrap_or("no email"),
        f.hours_worked,
        threshold - f.hours_worked,
      ));
    }
  }
  body.push('\n');
  body.push_str(FOOTER);

  Some(Message {
    to: operators.to_vec(),
    subject: format!("Daily Low Attendance Report - {}", long_date(date)),
    body,
  })
}

#[cfg(test)]
mod tests {
  use chrono::{FixedOffset, TimeZone as _, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::subject::Role;

  fn subject(email: Option<&str>) -> Subject {
    Subject {
      subject_id: Uuid::new_v4(),
      name:       "Ravi".into(),
      email:      email.map(str::to_owned),
      role:       Role::Student,
      rfid_tag:   "A1".into(),
      school_id:  None,
      active:     true,
      created_at: Utc::now(),
    }
  }

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 1, 10).unwrap() }

  #[test]
  fn no_email_means_no_message() {
    assert!(low_attendance_message(&subject(None), 0.0, 2.0, date()).is_none());
    assert!(incomplete_sessions_message(&subject(None), &[], date()).is_none());
  }

  #[test]
  fn low_attendance_reports_deficit() {
    let msg =
      low_attendance_message(&subject(Some("r@example.org")), 0.5, 2.0, date()).unwrap();
    assert_eq!(msg.to, vec!["r@example.org".to_string()]);
    assert_eq!(msg.subject, "Low Attendance Alert - Fri Jan 10 2025");
    assert!(msg.body.contains("Deficit:      1.50"), "{}", msg.body);
  }

  #[test]
  fn incomplete_lists_entry_times() {
    let entry = FixedOffset::east_opt(19_800)
      .unwrap()
      .with_ymd_and_hms(2025, 1, 10, 14, 0, 0)
      .unwrap();
    let msg = incomplete_sessions_message(
      &subject(Some("r@example.org")),
      &[Session::open(entry)],
      date(),
    )
    .unwrap();
    assert!(msg.body.contains("Entry 14:00:00"), "{}", msg.body);
  }

  #[test]
  fn summary_needs_operators() {
    assert!(low_attendance_summary_message(&[], &[], 2.0, date()).is_none());
    let msg = low_attendance_summary_message(
      &["ops@example.org".into()],
      &[Flagged { subject: subject(None), hours_worked: 0.0 }],
      2.0,
      date(),
    )
    .unwrap();
    assert!(msg.body.contains("Ravi <no email>: 0.00 h worked, 2.00 h short"));
  }

  #[test]
  fn summary_lines_end_with_newlines() {
    let msg =
      low_attendance_summary_message(&["ops@example.org".into()], &[], 2.0, date()).unwrap();
    assert!(
      msg.body.contains("All subjects met the minimum 2.00-hour requirement.\n\n"),
      "{}",
      msg.body
    );
    assert!(msg.body.ends_with(FOOTER));
  }
}
