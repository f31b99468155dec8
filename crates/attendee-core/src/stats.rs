//! Attendance statistics over a date range.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  record::DayRecord,
  school::School,
  subject::{Role, Subject},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceStats {
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub overall:    OverallStats,
  pub by_role:    BTreeMap<Role, RoleStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
  pub total_users:     usize,
  pub present_users:   usize,
  pub absent_users:    usize,
  /// Percentage of the roster with at least one record, two decimals.
  pub attendance_rate: f64,
  pub total_records:   usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleStats {
  pub total_users:     usize,
  pub present_users:   usize,
  pub attendance_rate: f64,
  pub total_records:   usize,
}

/// Compute statistics for `roster` from `records`, which the caller has
/// already restricted to the date range. Records of subjects outside the
/// roster are not counted.
pub fn compute(
  roster: &[Subject],
  records: &[DayRecord],
  start_date: Option<NaiveDate>,
  end_date: Option<NaiveDate>,
) -> AttendanceStats {
  let roles: HashMap<Uuid, Role> =
    roster.iter().map(|s| (s.subject_id, s.role)).collect();
  let counted: Vec<&DayRecord> = records
    .iter()
    .filter(|r| roles.contains_key(&r.subject_id))
    .collect();
  let present: HashSet<Uuid> = counted.iter().map(|r| r.subject_id).collect();

  let by_role = Role::ALL
    .into_iter()
    .filter(|role| *role != Role::Admin)
    .map(|role| {
      let total_users = roster.iter().filter(|s| s.role == role).count();
      let present_users = present.iter().filter(|id| roles[*id] == role).count();
      let total_records =
        counted.iter().filter(|r| roles[&r.subject_id] == role).count();
      (role, RoleStats {
        total_users,
        present_users,
        attendance_rate: rate(present_users, total_users),
        total_records,
      })
    })
    .collect();

  AttendanceStats {
    start_date,
    end_date,
    overall: OverallStats {
      total_users:     roster.len(),
      present_users:   present.len(),
      absent_users:    roster.len() - present.len(),
      attendance_rate: rate(present.len(), roster.len()),
      total_records:   counted.len(),
    },
    by_role,
  }
}

fn rate(present: usize, total: usize) -> f64 {
  if total == 0 {
    return 0.0;
  }
  (present as f64 / total as f64 * 10_000.0).round() / 100.0
}

// ─── Overview ────────────────────────────────────────────────────────────────

/// Whole-deployment headcounts for the operator dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
  pub date:                NaiveDate,
  pub total_users:         usize,
  pub active_users:        usize,
  pub inactive_users:      usize,
  pub total_schools:       usize,
  /// Day records dated `date`.
  pub today_attendance:    usize,
  pub total_records:       usize,
  /// `today_attendance` over `total_users`, as a percentage with one decimal.
  pub avg_attendance_rate: f64,
  pub users_by_role:       BTreeMap<Role, usize>,
  /// Schools without a district are counted under `unknown`.
  pub schools_by_district: BTreeMap<String, usize>,
}

/// Summarise every subject (admins included) and school.
pub fn overview(
  subjects: &[Subject],
  schools: &[School],
  date: NaiveDate,
  today_attendance: usize,
  total_records: usize,
) -> Overview {
  let active_users = subjects.iter().filter(|s| s.active).count();

  let mut users_by_role = BTreeMap::new();
  for subject in subjects {
    *users_by_role.entry(subject.role).or_insert(0) += 1;
  }

  let mut schools_by_district = BTreeMap::new();
  for school in schools {
    let district = school.district.clone().unwrap_or_else(|| "unknown".to_owned());
    *schools_by_district.entry(district).or_insert(0) += 1;
  }

  let avg_attendance_rate = if subjects.is_empty() {
    0.0
  } else {
    (today_attendance as f64 / subjects.len() as f64 * 1_000.0).round() / 10.0
  };

  Overview {
    date,
    total_users: subjects.len(),
    active_users,
    inactive_users: subjects.len() - active_users,
    total_schools: schools.len(),
    today_attendance,
    total_records,
    avg_attendance_rate,
    users_by_role,
    schools_by_district,
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn subject(role: Role) -> Subject {
    Subject {
      subject_id: Uuid::new_v4(),
      name:       "x".into(),
      email:      None,
      role,
      rfid_tag:   Uuid::new_v4().to_string(),
      school_id:  None,
      active:     true,
      created_at: Utc::now(),
    }
  }

  fn on(day: u32, s: &Subject) -> DayRecord {
    DayRecord::new(
      s.subject_id,
      NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
      Utc::now(),
    )
  }

  #[test]
  fn counts_distinct_present_subjects() {
    let a = subject(Role::Student);
    let b = subject(Role::Student);
    let t = subject(Role::Teacher);
    let records = vec![on(10, &a), on(11, &a), on(10, &t)];

    let stats = compute(&[a, b, t], &records, None, None);
    assert_eq!(stats.overall.total_users, 3);
    assert_eq!(stats.overall.present_users, 2);
    assert_eq!(stats.overall.absent_users, 1);
    assert_eq!(stats.overall.total_records, 3);
    assert_eq!(stats.overall.attendance_rate, 66.67);

    let students = &stats.by_role[&Role::Student];
    assert_eq!(students.total_users, 2);
    assert_eq!(students.present_users, 1);
    assert_eq!(students.total_records, 2);
    assert_eq!(students.attendance_rate, 50.0);
    assert!(!stats.by_role.contains_key(&Role::Admin));
  }

  #[test]
  fn empty_roster_has_zero_rate() {
    let stats = compute(&[], &[], None, None);
    assert_eq!(stats.overall.attendance_rate, 0.0);
    assert_eq!(stats.by_role[&Role::Principal].attendance_rate, 0.0);
  }

  #[test]
  fn overview_groups_users_and_schools() {
    let mut inactive = subject(Role::Student);
    inactive.active = false;
    let subjects = vec![subject(Role::Student), inactive, subject(Role::Admin)];
    let school = |district: Option<&str>| School {
      school_id:  Uuid::new_v4(),
      name:       "GHS".into(),
      district:   district.map(str::to_owned),
      state:      None,
      created_at: Utc::now(),
    };
    let schools = vec![school(Some("Pune")), school(Some("Pune")), school(None)];
    let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

    let o = overview(&subjects, &schools, date, 2, 7);
    assert_eq!((o.total_users, o.active_users, o.inactive_users), (3, 2, 1));
    assert_eq!(o.users_by_role[&Role::Student], 2);
    assert_eq!(o.users_by_role[&Role::Admin], 1);
    assert!(!o.users_by_role.contains_key(&Role::Teacher));
    assert_eq!(o.schools_by_district["Pune"], 2);
    assert_eq!(o.schools_by_district["unknown"], 1);
    assert_eq!(o.avg_attendance_rate, 66.7);
    assert_eq!(o.total_records, 7);
  }
}
