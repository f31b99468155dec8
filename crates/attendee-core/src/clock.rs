//! Timestamp normalisation against a fixed regional offset.
//!
//! Scanning terminals report local wall-clock time with no offset
//! (`2025-08-19T10:26:00`). [`LocalClock`] attaches the configured offset and
//! is the only place in the crate that does so.

use chrono::{
  DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone as _, Utc,
};
use tracing::warn;

use crate::{Error, Result};

/// Wall-clock layouts accepted from terminals, tried in order.
const LOCAL_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S",
];

/// A clock pinned to one fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
  offset: FixedOffset,
}

impl LocalClock {
  pub fn new(offset: FixedOffset) -> Self { Self { offset } }

  pub fn offset(&self) -> FixedOffset { self.offset }

  pub fn now(&self) -> DateTime<FixedOffset> { self.localize(Utc::now()) }

  pub fn today(&self) -> NaiveDate { self.now().date_naive() }

  pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&self.offset)
  }

  /// The instant at which `date` reaches `time` in this offset.
  pub fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
    // A fixed offset has no gaps or folds, so the mapping is always single.
    self
      .offset
      .from_utc_datetime(&(date.and_time(time) - self.offset))
  }

  /// Normalise an optional terminal timestamp, falling back to now.
  pub fn normalize(&self, raw: Option<&str>) -> DateTime<FixedOffset> {
    self.normalize_at(raw, Utc::now())
  }

  /// As [`normalize`](Self::normalize) with an explicit "now".
  ///
  /// Never fails: absent or blank input yields `now`, and malformed input
  /// yields `now` plus a warning.
  pub fn normalize_at(
    &self,
    raw: Option<&str>,
    now: DateTime<Utc>,
  ) -> DateTime<FixedOffset> {
    let raw = match raw.map(str::trim) {
      Some(r) if !r.is_empty() => r,
      _ => return self.localize(now),
    };

    match self.parse_local(raw) {
      Some(instant) => instant,
      None => {
        warn!(timestamp = raw, "invalid timestamp received, using current time");
        self.localize(now)
      }
    }
  }

  /// Parse a wall-clock string in this offset. Fully-qualified RFC 3339
  /// strings are also accepted and converted into this offset.
  pub fn parse_local(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
    LOCAL_FORMATS
      .iter()
      .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
      .and_then(|naive| self.offset.from_local_datetime(&naive).single())
      .or_else(|| {
        DateTime::parse_from_rfc3339(raw)
          .ok()
          .map(|dt| dt.with_timezone(&self.offset))
      })
  }
}

impl Default for LocalClock {
  /// UTC+05:30.
  fn default() -> Self {
    Self::new(FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("valid offset"))
  }
}

/// Parse `+05:30`, `-0300`, `+5` or `Z` into a [`FixedOffset`].
pub fn parse_offset(s: &str) -> Result<FixedOffset> {
  let invalid = || Error::InvalidOffset(s.to_owned());
  let trimmed = s.trim();
  if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
    return FixedOffset::east_opt(0).ok_or_else(invalid);
  }

  let (sign, rest) = match trimmed.as_bytes().first() {
    Some(b'+') => (1, &trimmed[1..]),
    Some(b'-') => (-1, &trimmed[1..]),
    _ => return Err(invalid()),
  };

  let (hours, minutes) = match rest.split_once(':') {
    Some((h, m)) => (h, m),
    None if rest.len() == 4 => rest.split_at(2),
    None => (rest, "0"),
  };
  let hours: i32 = hours.parse().map_err(|_| invalid())?;
  let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
  if !(0..60).contains(&minutes) {
    return Err(invalid());
  }

  FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Parse a wall-clock time of day such as `22:00` or `22:00:00`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s.trim(), "%H:%M")
    .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
    .map_err(|_| Error::InvalidTimeOfDay(s.to_owned()))
}
