//! Attendance day records and the sessions they hold.
//!
//! One [`DayRecord`] exists per (subject, calendar date). Its `sessions` list is
//! the source of truth; `entry_time` and `exit_time` mirror it for older
//! readers and are recomputed by [`DayRecord::sync_legacy_fields`].

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── Session ─────────────────────────────────────────────────────────────────

/// One entry/exit pair. `exit_time == None` means the subject is still inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub entry_time:    DateTime<FixedOffset>,
  pub exit_time:     Option<DateTime<FixedOffset>>,
  /// Set when the exit was forced by housekeeping rather than a scan.
  #[serde(default)]
  pub auto_exit_set: bool,
}

impl Session {
  pub fn open(entry_time: DateTime<FixedOffset>) -> Self {
    Self { entry_time, exit_time: None, auto_exit_set: false }
  }

  pub fn is_open(&self) -> bool { self.exit_time.is_none() }

  /// Fractional hours between entry and exit; open sessions count as zero.
  pub fn hours(&self) -> f64 {
    match self.exit_time {
      Some(exit) => {
        (exit - self.entry_time).num_milliseconds() as f64 / 3_600_000.0
      }
      None => 0.0,
    }
  }
}

// ─── Coarse status label ─────────────────────────────────────────────────────

/// Operator-assigned label, independent of the session list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
  Present,
  Absent,
  Late,
  Excused,
}

impl AttendanceStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Present => "present",
      Self::Absent => "absent",
      Self::Late => "late",
      Self::Excused => "excused",
    }
  }
}

impl fmt::Display for AttendanceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AttendanceStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "present" => Ok(Self::Present),
      "absent" => Ok(Self::Absent),
      "late" => Ok(Self::Late),
      "excused" => Ok(Self::Excused),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Day record ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
  pub record_id:  Uuid,
  pub subject_id: Uuid,
  /// Calendar date in the configured local offset; the partition key.
  pub date:       NaiveDate,
  /// Chronological by entry time; at most the last one is open.
  pub sessions:   Vec<Session>,
  /// Legacy mirror of the first session's entry.
  pub entry_time: Option<DateTime<FixedOffset>>,
  /// Legacy mirror of the most recent recorded exit.
  pub exit_time:  Option<DateTime<FixedOffset>>,
  pub status:     Option<AttendanceStatus>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl DayRecord {
  /// An empty record for `subject_id` on `date`.
  pub fn new(subject_id: Uuid, date: NaiveDate, now: DateTime<Utc>) -> Self {
    Self {
      record_id: Uuid::new_v4(),
      subject_id,
      date,
      sessions: Vec::new(),
      entry_time: None,
      exit_time: None,
      status: None,
      created_at: now,
      updated_at: now,
    }
  }

  /// The trailing open session and its 1-based number, if any.
  pub fn open_session(&self) -> Option<(usize, &Session)> {
    self
      .sessions
      .last()
      .filter(|s| s.is_open())
      .map(|s| (self.sessions.len(), s))
  }

  pub fn has_open_session(&self) -> bool {
    self.sessions.iter().any(Session::is_open)
  }

  /// Recompute the legacy mirrors from `sessions`.
  ///
  /// `exit_time` only moves forward: an open trailing session keeps the
  /// previous exit.
  pub fn sync_legacy_fields(&mut self) {
    self.entry_time = self.sessions.first().map(|s| s.entry_time);
    if let Some(exit) = self.sessions.last().and_then(|s| s.exit_time) {
      self.exit_time = Some(exit);
    }
  }

  /// Total hours over closed sessions.
  pub fn hours_worked(&self) -> f64 {
    self.sessions.iter().map(Session::hours).sum()
  }

  /// Computed presence for this record's date.
  pub fn presence(&self) -> Presence {
    if self.open_session().is_some() {
      Presence::In
    } else if self.sessions.is_empty() {
      Presence::Absent
    } else {
      Presence::Out
    }
  }
}

// ─── Ledger classification ───────────────────────────────────────────────────

/// Whether an event opened a session or closed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  Entry,
  Exit,
}

/// Current status of a subject, derived from the day record on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
  /// The last session is open.
  In,
  /// The subject came and went; every session is closed.
  Out,
  /// No sessions on that date.
  Absent,
}

/// Round to two decimals, the precision hours are reported at.
pub fn round_hours(hours: f64) -> f64 { (hours * 100.0).round() / 100.0 }
