//! `attendee` — command-line client for the Attendee server.
//!
//! Operators use it for quick lookups; a cron job uses it to trigger the
//! end-of-day housekeeping and the low-attendance check.
//!
//! # Usage
//!
//! ```text
//! attendee --url http://localhost:5000 --user office --password secret today
//! attendee --config ~/.config/attendee/config.toml auto-close
//! ```

mod client;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:5000";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "attendee", about = "Command-line client for the Attendee server")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the attendee server (default: http://localhost:5000).
  #[arg(long, env = "ATTENDEE_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "ATTENDEE_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "ATTENDEE_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Record a tag scan as a terminal would.
  Scan {
    tag: String,
    /// Local wall-clock time, e.g. 2025-01-10T09:00:00. Defaults to now.
    #[arg(long)]
    at:  Option<String>,
  },
  /// Discard today's unclosed sessions (no-op before the cutoff).
  AutoClose,
  /// Flag subjects below the daily hours threshold and notify them.
  CheckLow {
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// Every record of a day with hours worked.
  Today {
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// Whether a subject is currently in, out, or absent.
  Presence {
    subject_id: Uuid,
    #[arg(long)]
    date:       Option<NaiveDate>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

/// CLI flags override the config file, which overrides defaults.
fn resolve(args: &Args, file: ConfigFile) -> ApiConfig {
  let pick = |flag: &Option<String>, from_file: String| {
    flag.clone().or_else(|| (!from_file.is_empty()).then_some(from_file))
  };
  ApiConfig {
    base_url: pick(&args.url, file.url).unwrap_or_else(|| DEFAULT_URL.to_string()),
    username: pick(&args.user, file.username).unwrap_or_default(),
    password: pick(&args.password, file.password).unwrap_or_default(),
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let client = ApiClient::new(resolve(&args, file_cfg))?;

  let output = match &args.command {
    Command::Scan { tag, at } => client.scan(tag, at.as_deref()).await?,
    Command::AutoClose => client.auto_close().await?,
    Command::CheckLow { date } => client.check_low(*date).await?,
    Command::Today { date } => client.today(*date).await?,
    Command::Presence { subject_id, date } => client.presence(*subject_id, *date).await?,
  };

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
