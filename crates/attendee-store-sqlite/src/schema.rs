//! SQL schema for the Attendee SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS schools (
    school_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    district    TEXT,
    state       TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT,
    role        TEXT NOT NULL,    -- 'student' | 'teacher' | 'principal' | 'admin'
    rfid_tag    TEXT NOT NULL UNIQUE,
    school_id   TEXT REFERENCES schools(school_id) ON DELETE SET NULL,
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);

-- One row per (subject, local calendar date).
-- `sessions` is the source of truth; entry_time/exit_time mirror it.
CREATE TABLE IF NOT EXISTS attendance (
    record_id   TEXT PRIMARY KEY,
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    date        TEXT NOT NULL,    -- YYYY-MM-DD in the configured offset
    sessions    TEXT NOT NULL DEFAULT '[]',
    entry_time  TEXT,             -- RFC 3339 with local offset
    exit_time   TEXT,
    status      TEXT,             -- 'present' | 'absent' | 'late' | 'excused'
    has_open    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (subject_id, date)
);

CREATE INDEX IF NOT EXISTS attendance_date_idx ON attendance(date);
CREATE INDEX IF NOT EXISTS attendance_open_idx ON attendance(date, has_open);
CREATE INDEX IF NOT EXISTS subjects_role_idx   ON subjects(role);

PRAGMA user_version = 1;
";
