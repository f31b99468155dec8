//! The session ledger: decides whether an event checks a subject in or out.
//!
//! The decision is a pure function of the day's existing record and the
//! event instant. Stores run it inside their own transaction so the
//! read-decide-write cycle is atomic per (subject, date).

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{DayRecord, EventKind, Session};

/// Result of applying one event to a subject's day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toggle {
  pub record:         DayRecord,
  pub kind:           EventKind,
  /// 1-based number of the session that was opened or closed.
  pub session_number: usize,
  /// `true` when `record` did not previously exist and must be inserted.
  pub created:        bool,
}

/// Apply an event at `at` to `existing`, the subject's record for
/// `at.date_naive()` (or `None` if there is none yet).
///
/// An open trailing session is always closed first; a new session is only
/// opened when every earlier one is closed.
pub fn toggle(
  existing: Option<DayRecord>,
  subject_id: Uuid,
  at: DateTime<FixedOffset>,
  now: DateTime<Utc>,
) -> Toggle {
  let date = at.date_naive();

  let (mut record, created) = match existing {
    Some(record) => {
      debug_assert_eq!(record.subject_id, subject_id);
      debug_assert_eq!(record.date, date);
      (record, false)
    }
    None => (DayRecord::new(subject_id, date, now), true),
  };

  let (kind, session_number) = match record.sessions.last_mut() {
    Some(last) if last.is_open() => {
      last.exit_time = Some(at);
      (EventKind::Exit, record.sessions.len())
    }
    _ => {
      record.sessions.push(Session::open(at));
      (EventKind::Entry, record.sessions.len())
    }
  };

  record.sync_legacy_fields();
  record.updated_at = now;

  Toggle { record, kind, session_number, created }
}
