//! Low-attendance audit.
//!
//! Sums closed-session hours per roster subject for one date and flags those
//! strictly below the threshold. Subjects with no record that day count as
//! zero hours.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{record::DayRecord, subject::Subject};

/// Default minimum daily presence, in hours.
pub const DEFAULT_THRESHOLD_HOURS: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flagged {
  pub subject:      Subject,
  pub hours_worked: f64,
}

/// Flag every roster subject whose hours on the records' date fall below
/// `threshold`. Records belonging to subjects outside the roster are ignored.
/// Output follows roster order.
pub fn flag_low_attendance(
  roster: &[Subject],
  records: &[DayRecord],
  threshold: f64,
) -> Vec<Flagged> {
  let mut hours: HashMap<Uuid, f64> = HashMap::new();
  for record in records {
    *hours.entry(record.subject_id).or_default() += record.hours_worked();
  }

  roster
    .iter()
    .filter_map(|subject| {
      let worked = hours.get(&subject.subject_id).copied().unwrap_or(0.0);
      (worked < threshold).then(|| Flagged {
        subject:      subject.clone(),
        hours_worked: worked,
      })
    })
    .collect()
}

/// Result of [`AttendanceService::evaluate_low_attendance`](crate::service::AttendanceService::evaluate_low_attendance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowAttendanceReport {
  pub date:        NaiveDate,
  pub flagged:     Vec<Flagged>,
  /// Size of the roster that was evaluated.
  pub total_users: usize,
  /// Individual notifications delivered.
  pub notified:    usize,
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, FixedOffset, TimeZone as _, Utc};

  use super::*;
  use crate::{record::Session, subject::Role};

  fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(19_800)
      .unwrap()
      .with_ymd_and_hms(2025, 1, 10, h, m, 0)
      .unwrap()
  }

  fn subject(name: &str, role: Role) -> Subject {
    Subject {
      subject_id: Uuid::new_v4(),
      name:       name.into(),
      email:      None,
      role,
      rfid_tag:   format!("tag-{name}"),
      school_id:  None,
      active:     true,
      created_at: Utc::now(),
    }
  }

  fn record_for(subject: &Subject, sessions: Vec<Session>) -> DayRecord {
    let mut r = DayRecord::new(subject.subject_id, at(0, 0).date_naive(), Utc::now());
    r.sessions = sessions;
    r
  }

  fn closed(from: (u32, u32), to: (u32, u32)) -> Session {
    Session { exit_time: Some(at(to.0, to.1)), ..Session::open(at(from.0, from.1)) }
  }

  #[test]
  fn subject_without_record_counts_as_zero() {
    let s1 = subject("s1", Role::Student);
    let s2 = subject("s2", Role::Student);
    let records = vec![record_for(&s1, vec![closed((9, 0), (13, 0))])];

    let flagged = flag_low_attendance(&[s1, s2.clone()], &records, 2.0);
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].subject.subject_id, s2.subject_id);
    assert_eq!(flagged[0].hours_worked, 0.0);
  }

  #[test]
  fn open_sessions_contribute_nothing() {
    let s = subject("s", Role::Teacher);
    let records = vec![record_for(&s, vec![
      closed((9, 0), (10, 0)),
      Session::open(at(11, 0)),
    ])];

    let flagged = flag_low_attendance(std::slice::from_ref(&s), &records, 2.0);
    assert_eq!(flagged.len(), 1);
    assert!((flagged[0].hours_worked - 1.0).abs() < 1e-9);
  }

  #[test]
  fn threshold_is_strict() {
    let exact = subject("exact", Role::Student);
    let under = subject("under", Role::Student);
    let records = vec![
      record_for(&exact, vec![closed((9, 0), (11, 0))]),
      record_for(&under, vec![closed((9, 0), (10, 59))]),
    ];

    let flagged = flag_low_attendance(&[exact, under.clone()], &records, 2.0);
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].subject.subject_id, under.subject_id);
  }

  #[test]
  fn sessions_are_summed() {
    let s = subject("s", Role::Principal);
    let records = vec![record_for(&s, vec![
      closed((9, 0), (10, 0)),
      closed((14, 0), (15, 30)),
    ])];
    assert!(flag_low_attendance(&[s], &records, 2.0).is_empty());
  }

  #[test]
  fn records_outside_roster_are_ignored() {
    let admin = subject("admin", Role::Admin);
    let records = vec![record_for(&admin, vec![Session::open(at(9, 0))])];
    assert!(flag_low_attendance(&[], &records, 2.0).is_empty());
  }
}
