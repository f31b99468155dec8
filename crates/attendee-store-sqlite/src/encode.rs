//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Instants are stored as RFC 3339 strings; session instants keep their local
//! offset. Dates are `YYYY-MM-DD` so they sort lexically. The session list is
//! compact JSON. UUIDs are stored as hyphenated lowercase strings.

use attendee_core::{
  record::{DayRecord, Session},
  school::School,
  subject::Subject,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_local(dt: DateTime<FixedOffset>) -> String { dt.to_rfc3339() }

pub fn decode_local(s: &str) -> Result<DateTime<FixedOffset>> {
  DateTime::parse_from_rfc3339(s).map_err(|e| Error::DateParse(e.to_string()))
}

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const SUBJECT_COLUMNS: &str =
  "subject_id, name, email, role, rfid_tag, school_id, active, created_at";

pub const SCHOOL_COLUMNS: &str = "school_id, name, district, state, created_at";

pub const RECORD_COLUMNS: &str = "record_id, subject_id, date, sessions, entry_time, \
                                  exit_time, status, created_at, updated_at";

// ─── Subjects ────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub name:       String,
  pub email:      Option<String>,
  pub role:       String,
  pub rfid_tag:   String,
  pub school_id:  Option<String>,
  pub active:     bool,
  pub created_at: String,
}

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id: row.get(0)?,
      name:       row.get(1)?,
      email:      row.get(2)?,
      role:       row.get(3)?,
      rfid_tag:   row.get(4)?,
      school_id:  row.get(5)?,
      active:     row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn encode(subject: &Subject) -> Self {
    Self {
      subject_id: encode_uuid(subject.subject_id),
      name:       subject.name.clone(),
      email:      subject.email.clone(),
      role:       subject.role.as_str().to_owned(),
      rfid_tag:   subject.rfid_tag.clone(),
      school_id:  subject.school_id.map(encode_uuid),
      active:     subject.active,
      created_at: encode_dt(subject.created_at),
    }
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      name:       self.name,
      email:      self.email,
      role:       self.role.parse()?,
      rfid_tag:   self.rfid_tag,
      school_id:  self.school_id.as_deref().map(decode_uuid).transpose()?,
      active:     self.active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Schools ─────────────────────────────────────────────────────────────────

pub struct RawSchool {
  pub school_id:  String,
  pub name:       String,
  pub district:   Option<String>,
  pub state:      Option<String>,
  pub created_at: String,
}

impl RawSchool {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      school_id:  row.get(0)?,
      name:       row.get(1)?,
      district:   row.get(2)?,
      state:      row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_school(self) -> Result<School> {
    Ok(School {
      school_id:  decode_uuid(&self.school_id)?,
      name:       self.name,
      district:   self.district,
      state:      self.state,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Day records ─────────────────────────────────────────────────────────────

/// Raw strings of an `attendance` row, in [`RECORD_COLUMNS`] order.
pub struct RawRecord {
  pub record_id:  String,
  pub subject_id: String,
  pub date:       String,
  pub sessions:   String,
  pub entry_time: Option<String>,
  pub exit_time:  Option<String>,
  pub status:     Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:  row.get(0)?,
      subject_id: row.get(1)?,
      date:       row.get(2)?,
      sessions:   row.get(3)?,
      entry_time: row.get(4)?,
      exit_time:  row.get(5)?,
      status:     row.get(6)?,
      created_at: row.get(7)?,
      updated_at: row.get(8)?,
    })
  }

  pub fn encode(record: &DayRecord) -> Result<Self> {
    Ok(Self {
      record_id:  encode_uuid(record.record_id),
      subject_id: encode_uuid(record.subject_id),
      date:       encode_date(record.date),
      sessions:   serde_json::to_string(&record.sessions)?,
      entry_time: record.entry_time.map(encode_local),
      exit_time:  record.exit_time.map(encode_local),
      status:     record.status.map(|s| s.as_str().to_owned()),
      created_at: encode_dt(record.created_at),
      updated_at: encode_dt(record.updated_at),
    })
  }

  pub fn into_record(self) -> Result<DayRecord> {
    let sessions: Vec<Session> = serde_json::from_str(&self.sessions)?;
    Ok(DayRecord {
      record_id: decode_uuid(&self.record_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      date: decode_date(&self.date)?,
      sessions,
      entry_time: self.entry_time.as_deref().map(decode_local).transpose()?,
      exit_time: self.exit_time.as_deref().map(decode_local).transpose()?,
      status: self.status.as_deref().map(str::parse).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
