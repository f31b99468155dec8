//! [`SqliteStore`] — the SQLite implementation of [`AttendanceStore`].

use std::path::Path;

use attendee_core::{
  autoclose::{self, Cleanup},
  ledger::{self, Toggle},
  record::DayRecord,
  school::{NewSchool, School, SchoolPatch},
  store::{AttendanceStore, RecordQuery, SubjectFilter},
  subject::{NewSubject, Subject, SubjectPatch},
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, types::Value};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RECORD_COLUMNS, RawRecord, RawSchool, RawSubject, SCHOOL_COLUMNS, SUBJECT_COLUMNS,
    encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// are serialised on the connection's thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_records(
    &self,
    where_clause: &'static str,
    params: Vec<Value>,
  ) -> Result<Vec<DayRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {RECORD_COLUMNS} FROM attendance {where_clause}
           ORDER BY date DESC, created_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

// ─── Row writes ──────────────────────────────────────────────────────────────

fn insert_record(conn: &rusqlite::Connection, record: &DayRecord) -> Result<()> {
  let has_open = record.has_open_session();
  let raw = RawRecord::encode(record)?;
  conn
    .execute(
      "INSERT INTO attendance (
         record_id, subject_id, date, sessions, entry_time, exit_time,
         status, has_open, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      rusqlite::params![
        raw.record_id,
        raw.subject_id,
        raw.date,
        raw.sessions,
        raw.entry_time,
        raw.exit_time,
        raw.status,
        has_open,
        raw.created_at,
        raw.updated_at,
      ],
    )
    .map_err(tokio_rusqlite::Error::from)?;
  Ok(())
}

fn update_record(conn: &rusqlite::Connection, record: &DayRecord) -> Result<()> {
  let has_open = record.has_open_session();
  let raw = RawRecord::encode(record)?;
  conn
    .execute(
      "UPDATE attendance
          SET sessions = ?2, entry_time = ?3, exit_time = ?4, status = ?5,
              has_open = ?6, updated_at = ?7
        WHERE record_id = ?1",
      rusqlite::params![
        raw.record_id,
        raw.sessions,
        raw.entry_time,
        raw.exit_time,
        raw.status,
        has_open,
        raw.updated_at,
      ],
    )
    .map_err(tokio_rusqlite::Error::from)?;
  Ok(())
}

fn load_record(
  conn: &rusqlite::Connection,
  where_clause: &str,
  params: impl rusqlite::Params,
) -> Result<Option<DayRecord>> {
  conn
    .query_row(
      &format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE {where_clause}"),
      params,
      RawRecord::from_row,
    )
    .optional()
    .map_err(tokio_rusqlite::Error::from)?
    .map(RawRecord::into_record)
    .transpose()
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = crate::Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn add_subject(&self, input: NewSubject) -> Result<Subject> {
    let subject = Subject {
      subject_id: Uuid::new_v4(),
      name:       input.name,
      email:      input.email,
      role:       input.role,
      rfid_tag:   input.rfid_tag,
      school_id:  input.school_id,
      active:     true,
      created_at: Utc::now(),
    };
    let raw = RawSubject::encode(&subject);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (
             subject_id, name, email, role, rfid_tag, school_id, active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            raw.subject_id,
            raw.name,
            raw.email,
            raw.role,
            raw.rfid_tag,
            raw.school_id,
            raw.active,
            raw.created_at,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE subject_id = ?1"),
            rusqlite::params![id_str],
            RawSubject::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn find_subject_by_tag(&self, tag: &str) -> Result<Option<Subject>> {
    let tag = tag.to_owned();

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE rfid_tag = ?1"),
            rusqlite::params![tag],
            RawSubject::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn list_subjects(&self, filter: &SubjectFilter) -> Result<Vec<Subject>> {
    let mut conds: Vec<&'static str> = vec![];
    let mut params: Vec<Value> = vec![];
    if let Some(role) = filter.role {
      conds.push("role = ?");
      params.push(Value::Text(role.as_str().to_owned()));
    }
    if let Some(role) = filter.exclude_role {
      conds.push("role != ?");
      params.push(Value::Text(role.as_str().to_owned()));
    }
    if let Some(school_id) = filter.school_id {
      conds.push("school_id = ?");
      params.push(Value::Text(encode_uuid(school_id)));
    }
    if let Some(active) = filter.active {
      conds.push("active = ?");
      params.push(Value::Integer(active.into()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBJECT_COLUMNS} FROM subjects {where_clause} ORDER BY name, created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn update_subject(
    &self,
    id: Uuid,
    patch: SubjectPatch,
  ) -> Result<Option<Subject>> {
    let Some(mut subject) = self.get_subject(id).await? else {
      return Ok(None);
    };
    patch.apply(&mut subject);
    let raw = RawSubject::encode(&subject);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE subjects
              SET name = ?2, email = ?3, role = ?4, rfid_tag = ?5,
                  school_id = ?6, active = ?7
            WHERE subject_id = ?1",
          rusqlite::params![
            raw.subject_id,
            raw.name,
            raw.email,
            raw.role,
            raw.rfid_tag,
            raw.school_id,
            raw.active,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(Some(subject))
  }

  async fn delete_subject(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM subjects WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Schools ───────────────────────────────────────────────────────────────

  async fn add_school(&self, input: NewSchool) -> Result<School> {
    let school = School {
      school_id:  Uuid::new_v4(),
      name:       input.name,
      district:   input.district,
      state:      input.state,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(school.school_id);
    let at_str = encode_dt(school.created_at);
    let (name, district, state) =
      (school.name.clone(), school.district.clone(), school.state.clone());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO schools (school_id, name, district, state, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, district, state, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(school)
  }

  async fn get_school(&self, id: Uuid) -> Result<Option<School>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSchool> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SCHOOL_COLUMNS} FROM schools WHERE school_id = ?1"),
            rusqlite::params![id_str],
            RawSchool::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSchool::into_school).transpose()
  }

  async fn list_schools(&self) -> Result<Vec<School>> {
    let raws: Vec<RawSchool> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {SCHOOL_COLUMNS} FROM schools ORDER BY name"))?;
        let rows = stmt
          .query_map([], RawSchool::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchool::into_school).collect()
  }

  async fn update_school(&self, id: Uuid, patch: SchoolPatch) -> Result<Option<School>> {
    let Some(mut school) = self.get_school(id).await? else {
      return Ok(None);
    };
    patch.apply(&mut school);

    let id_str = encode_uuid(id);
    let (name, district, state) =
      (school.name.clone(), school.district.clone(), school.state.clone());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE schools SET name = ?2, district = ?3, state = ?4 WHERE school_id = ?1",
          rusqlite::params![id_str, name, district, state],
        )?;
        Ok(())
      })
      .await?;

    Ok(Some(school))
  }

  async fn delete_school(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM schools WHERE school_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Day records ───────────────────────────────────────────────────────────

  async fn find_day_record(
    &self,
    subject_id: Uuid,
    date: NaiveDate,
  ) -> Result<Option<DayRecord>> {
    let subject_str = encode_uuid(subject_id);
    let date_str = encode_date(date);

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(load_record(
            conn,
            "subject_id = ?1 AND date = ?2",
            rusqlite::params![subject_str, date_str],
          )?)
        })
        .await?,
    )
  }

  async fn get_day_record(&self, id: Uuid) -> Result<Option<DayRecord>> {
    let id_str = encode_uuid(id);

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(load_record(conn, "record_id = ?1", rusqlite::params![id_str])?)
        })
        .await?,
    )
  }

  async fn create_day_record(&self, record: DayRecord) -> Result<DayRecord> {
    self
      .conn
      .call(move |conn| {
        insert_record(conn, &record)?;
        Ok(record)
      })
      .await
      .map_err(Into::into)
  }

  async fn update_day_record(&self, record: DayRecord) -> Result<DayRecord> {
    self
      .conn
      .call(move |conn| {
        update_record(conn, &record)?;
        Ok(record)
      })
      .await
      .map_err(Into::into)
  }

  async fn delete_day_record(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM attendance WHERE record_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn toggle_session(
    &self,
    subject_id: Uuid,
    at: DateTime<FixedOffset>,
  ) -> Result<Toggle> {
    let subject_str = encode_uuid(subject_id);
    let date_str = encode_date(at.date_naive());

    let toggle = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = load_record(
          &tx,
          "subject_id = ?1 AND date = ?2",
          rusqlite::params![subject_str, date_str],
        )?;
        let toggle = ledger::toggle(existing, subject_id, at, Utc::now());

        if toggle.created {
          insert_record(&tx, &toggle.record)?;
        } else {
          update_record(&tx, &toggle.record)?;
        }

        tx.commit()?;
        Ok(toggle)
      })
      .await?;

    debug!(
      record_id = %toggle.record.record_id,
      sessions = toggle.record.sessions.len(),
      "day record written"
    );
    Ok(toggle)
  }

  async fn discard_open_sessions(
    &self,
    record_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Option<Cleanup>> {
    let id_str = encode_uuid(record_id);

    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

          let Some(record) =
            load_record(&tx, "record_id = ?1", rusqlite::params![id_str])?
          else {
            return Ok(None);
          };

          let cleanup = autoclose::discard_open_sessions(record, now);
          match &cleanup {
            Cleanup::Untouched => {}
            Cleanup::Trimmed { record, .. } => update_record(&tx, record)?,
            Cleanup::Emptied { record_id, .. } => {
              tx.execute(
                "DELETE FROM attendance WHERE record_id = ?1",
                rusqlite::params![encode_uuid(*record_id)],
              )?;
            }
          }

          tx.commit()?;
          Ok(Some(cleanup))
        })
        .await?,
    )
  }

  async fn list_open_records_for_date(&self, date: NaiveDate) -> Result<Vec<DayRecord>> {
    self
      .query_records("WHERE date = ?1 AND has_open = 1", vec![Value::Text(
        encode_date(date),
      )])
      .await
  }

  async fn list_records_for_date(&self, date: NaiveDate) -> Result<Vec<DayRecord>> {
    self
      .query_records("WHERE date = ?1", vec![Value::Text(encode_date(date))])
      .await
  }

  async fn list_records(&self, query: &RecordQuery) -> Result<Vec<DayRecord>> {
    let (where_clause, mut params) = record_filter(query);

    // SQLite treats a negative LIMIT as unbounded.
    params.push(Value::Integer(query.limit.map_or(-1, |l| l as i64)));
    params.push(Value::Integer(query.offset.unwrap_or(0) as i64));

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM attendance {where_clause}
           ORDER BY date DESC, created_at ASC
           LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn count_records(&self, query: &RecordQuery) -> Result<usize> {
    let (where_clause, params) = record_filter(query);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM attendance {where_clause}"),
          rusqlite::params_from_iter(params),
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count as usize)
  }
}

/// `WHERE` clause and parameters for the filters of `query`.
fn record_filter(query: &RecordQuery) -> (String, Vec<Value>) {
  let mut conds: Vec<&'static str> = vec![];
  let mut params: Vec<Value> = vec![];
  if let Some(subject_id) = query.subject_id {
    conds.push("subject_id = ?");
    params.push(Value::Text(encode_uuid(subject_id)));
  }
  if let Some(start) = query.start_date {
    conds.push("date >= ?");
    params.push(Value::Text(encode_date(start)));
  }
  if let Some(end) = query.end_date {
    conds.push("date <= ?");
    params.push(Value::Text(encode_date(end)));
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (where_clause, params)
}
