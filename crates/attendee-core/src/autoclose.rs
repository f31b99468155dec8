//! End-of-day housekeeping for sessions nobody checked out of.
//!
//! An unclosed session at the cutoff carries no trustworthy departure time,
//! so it is discarded rather than closed at the cutoff.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{DayRecord, Session};

/// What discarding open sessions did to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Cleanup {
  /// The record had no open session.
  Untouched,
  /// Open sessions were dropped; closed ones remain and must be written back.
  Trimmed {
    record:    DayRecord,
    discarded: Vec<Session>,
  },
  /// Every session was open and no status label holds the record; it must be
  /// deleted.
  Emptied {
    record_id:  Uuid,
    subject_id: Uuid,
    discarded:  Vec<Session>,
  },
}

impl Cleanup {
  pub fn discarded(&self) -> &[Session] {
    match self {
      Cleanup::Untouched => &[],
      Cleanup::Trimmed { discarded, .. } | Cleanup::Emptied { discarded, .. } => {
        discarded
      }
    }
  }
}

/// Drop every open session from `record`.
///
/// A record carrying a status label outlives its sessions: it is trimmed down
/// to the label rather than deleted.
pub fn discard_open_sessions(mut record: DayRecord, now: DateTime<Utc>) -> Cleanup {
  if !record.has_open_session() {
    return Cleanup::Untouched;
  }

  let (discarded, kept): (Vec<_>, Vec<_>) =
    record.sessions.into_iter().partition(Session::is_open);

  if kept.is_empty() && record.status.is_none() {
    return Cleanup::Emptied {
      record_id: record.record_id,
      subject_id: record.subject_id,
      discarded,
    };
  }

  record.sessions = kept;
  if record.sessions.is_empty() {
    record.entry_time = None;
    record.exit_time = None;
  } else {
    record.sync_legacy_fields();
  }
  record.updated_at = now;
  Cleanup::Trimmed { record, discarded }
}

/// Whether housekeeping may run at `now` (local) given the daily `cutoff`.
pub fn is_due(now: DateTime<FixedOffset>, cutoff: NaiveTime) -> bool {
  now.time() >= cutoff
}

/// Outcome of one housekeeping run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AutoCloseOutcome {
  /// Invoked before today's cutoff; nothing was touched.
  NotYetDue { cutoff: DateTime<FixedOffset> },
  Completed(AutoCloseSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCloseSummary {
  pub date:               NaiveDate,
  pub updated_records:    usize,
  pub discarded_sessions: usize,
  /// Records removed because nothing closed was left in them.
  pub deleted_records:    usize,
}
