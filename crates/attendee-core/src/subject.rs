//! Subject — a person whose presence is tracked.
//!
//! The subject row carries identity and the activity flag only. Whether the
//! subject is currently on site is never stored here; it is derived from the
//! day's sessions (see [`crate::record::Presence`]).

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::Error;

/// The closed set of roles a subject may hold.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Student,
  Teacher,
  Principal,
  Admin,
}

impl Role {
  pub const ALL: [Role; 4] =
    [Role::Student, Role::Teacher, Role::Principal, Role::Admin];

  pub fn as_str(self) -> &'static str {
    match self {
      Role::Student => "student",
      Role::Teacher => "teacher",
      Role::Principal => "principal",
      Role::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "student" => Ok(Role::Student),
      "teacher" => Ok(Role::Teacher),
      "principal" => Ok(Role::Principal),
      "admin" => Ok(Role::Admin),
      other => Err(Error::UnknownRole(other.to_owned())),
    }
  }
}

/// A tracked person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  pub name:       String,
  /// Notification address. Subjects without one are never notified.
  pub email:      Option<String>,
  pub role:       Role,
  /// Physical RFID tag identifier; unique across subjects.
  pub rfid_tag:   String,
  pub school_id:  Option<Uuid>,
  /// Inactive subjects are rejected at scan time.
  pub active:     bool,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::AttendanceStore::add_subject`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
  pub name:      String,
  pub email:     Option<String>,
  pub role:      Role,
  pub rfid_tag:  String,
  pub school_id: Option<Uuid>,
}

/// Partial update for a subject. `None` leaves the field unchanged; for the
/// clearable fields `Some(None)` (an explicit JSON `null`) clears them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectPatch {
  pub name:      Option<String>,
  #[serde(default, deserialize_with = "clearable")]
  pub email:     Option<Option<String>>,
  pub role:      Option<Role>,
  pub rfid_tag:  Option<String>,
  #[serde(default, deserialize_with = "clearable")]
  pub school_id: Option<Option<Uuid>>,
  pub active:    Option<bool>,
}

/// Deserialise a present field, `null` included, as `Some`. Absent fields
/// fall back to `None` through `#[serde(default)]`.
pub(crate) fn clearable<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}

impl SubjectPatch {
  pub fn apply(self, subject: &mut Subject) {
    if let Some(name) = self.name {
      subject.name = name;
    }
    if let Some(email) = self.email {
      subject.email = email;
    }
    if let Some(role) = self.role {
      subject.role = role;
    }
    if let Some(tag) = self.rfid_tag {
      subject.rfid_tag = tag;
    }
    if let Some(school_id) = self.school_id {
      subject.school_id = school_id;
    }
    if let Some(active) = self.active {
      subject.active = active;
    }
  }
}
