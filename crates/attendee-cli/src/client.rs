//! Async HTTP client wrapping the attendee JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

/// Connection settings for the attendee API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Async HTTP client for the attendee JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Send `req` and return the JSON body, turning non-success statuses into
  /// errors carrying the server's `error` message.
  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Value> {
    debug!(what, "sending request");
    let resp = self
      .auth(req)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;

    let status = resp.status();
    let text = resp
      .text()
      .await
      .with_context(|| format!("reading {what} response"))?;

    if !status.is_success() {
      return Err(anyhow!("{what} → {status}: {}", error_message(&text)));
    }
    serde_json::from_str(&text).with_context(|| format!("deserialising {what} response"))
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  /// `POST /api/attendance`, as a scanning terminal would.
  pub async fn scan(&self, tag: &str, at: Option<&str>) -> Result<Value> {
    let req = self
      .client
      .post(self.url("/attendance"))
      .json(&json!({ "rfid_tag": tag, "timestamp": at }));
    self.send(req, "POST /attendance").await
  }

  /// `POST /api/attendance/auto-exit`
  pub async fn auto_close(&self) -> Result<Value> {
    let req = self.client.post(self.url("/attendance/auto-exit"));
    self.send(req, "POST /attendance/auto-exit").await
  }

  /// `POST /api/attendance/check-low-attendance`
  pub async fn check_low(&self, date: Option<NaiveDate>) -> Result<Value> {
    let req = self
      .client
      .post(self.url("/attendance/check-low-attendance"))
      .json(&json!({ "date": date }));
    self.send(req, "POST /attendance/check-low-attendance").await
  }

  /// `GET /api/attendance/today[?date=YYYY-MM-DD]`
  pub async fn today(&self, date: Option<NaiveDate>) -> Result<Value> {
    let mut req = self.client.get(self.url("/attendance/today"));
    if let Some(d) = date {
      req = req.query(&[("date", d.to_string())]);
    }
    self.send(req, "GET /attendance/today").await
  }

  /// `GET /api/subjects/{id}/presence[?date=YYYY-MM-DD]`
  pub async fn presence(&self, subject_id: Uuid, date: Option<NaiveDate>) -> Result<Value> {
    let mut req = self
      .client
      .get(self.url(&format!("/subjects/{subject_id}/presence")));
    if let Some(d) = date {
      req = req.query(&[("date", d.to_string())]);
    }
    self.send(req, "GET /subjects/{id}/presence").await
  }
}

/// The `error` field of a JSON error body, or the raw text when the body is
/// not JSON.
fn error_message(body: &str) -> String {
  match serde_json::from_str::<Value>(body) {
    Ok(v) => match v["error"].as_str() {
      Some(m) => m.to_owned(),
      None => v.to_string(),
    },
    Err(_) if body.trim().is_empty() => "no error message".to_owned(),
    Err(_) => body.trim().to_owned(),
  }
}
