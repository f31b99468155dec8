//! School — read-mostly reference data that subjects belong to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::clearable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
  pub school_id:  Uuid,
  pub name:       String,
  pub district:   Option<String>,
  pub state:      Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSchool {
  pub name:     String,
  pub district: Option<String>,
  pub state:    Option<String>,
}

/// Partial update for a school. `None` leaves the field unchanged and an
/// explicit `null` clears `district` or `state`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolPatch {
  pub name:     Option<String>,
  #[serde(default, deserialize_with = "clearable")]
  pub district: Option<Option<String>>,
  #[serde(default, deserialize_with = "clearable")]
  pub state:    Option<Option<String>>,
}

impl SchoolPatch {
  pub fn apply(self, school: &mut School) {
    if let Some(name) = self.name {
      school.name = name;
    }
    if let Some(district) = self.district {
      school.district = district;
    }
    if let Some(state) = self.state {
      school.state = state;
    }
  }
}
