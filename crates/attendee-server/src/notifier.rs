//! [`OutboxNotifier`] — renders notices and writes them to the log.
//!
//! No mail transport is wired up; deployments that need delivery can tail the
//! `attendee::outbox` target.

use std::convert::Infallible;

use attendee_core::{
  evaluate::Flagged,
  notify::{
    Message, Notifier, incomplete_sessions_message, low_attendance_message,
    low_attendance_summary_message,
  },
  record::Session,
  subject::Subject,
};
use chrono::NaiveDate;
use tracing::{debug, info};

pub struct OutboxNotifier {
  operators: Vec<String>,
  threshold: f64,
}

impl OutboxNotifier {
  pub fn new(operators: Vec<String>, threshold: f64) -> Self {
    Self { operators, threshold }
  }

  fn post(&self, message: Option<Message>, what: &str) {
    match message {
      Some(m) => info!(
        target: "attendee::outbox",
        to = %m.to.join(", "),
        subject = %m.subject,
        body = %m.body,
        "{what}"
      ),
      None => debug!(what, "no recipient; notice dropped"),
    }
  }
}

impl Notifier for OutboxNotifier {
  type Error = Infallible;

  async fn notify_subject_incomplete_sessions(
    &self,
    subject: &Subject,
    discarded: &[Session],
    date: NaiveDate,
  ) -> Result<(), Infallible> {
    self.post(
      incomplete_sessions_message(subject, discarded, date),
      "incomplete-session notice",
    );
    Ok(())
  }

  async fn notify_subject_low_attendance(
    &self,
    subject: &Subject,
    hours_worked: f64,
    date: NaiveDate,
  ) -> Result<(), Infallible> {
    self.post(
      low_attendance_message(subject, hours_worked, self.threshold, date),
      "low-attendance notice",
    );
    Ok(())
  }

  async fn notify_operators_low_attendance_summary(
    &self,
    flagged: &[Flagged],
    date: NaiveDate,
  ) -> Result<(), Infallible> {
    self.post(
      low_attendance_summary_message(&self.operators, flagged, self.threshold, date),
      "low-attendance summary",
    );
    Ok(())
  }
}
