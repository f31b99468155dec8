//! Attendee server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `ATTENDEE_*` environment variables, opens an in-process SQLite store, and
//! serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```text
//! cargo run -p attendee-server --bin server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use attendee_core::service::AttendanceService;
use attendee_server::{AppState, ServerConfig, notifier::OutboxNotifier};
use attendee_store_sqlite::SqliteStore;
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Attendee attendance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("ATTENDEE")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("operator_emails"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let policy = server_cfg.policy().context("invalid attendance policy")?;
  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if server_cfg.operator_emails.is_empty() {
    tracing::warn!("no operator_emails configured; daily summaries will be dropped");
  }
  let notifier = OutboxNotifier::new(
    server_cfg.operator_emails.clone(),
    server_cfg.low_attendance_hours,
  );

  let state = AppState {
    service: Arc::new(AttendanceService::new(
      Arc::new(store),
      Arc::new(notifier),
      policy,
    )),
    auth:    Arc::new(server_cfg.auth()),
  };

  let app = attendee_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(
    offset = %policy.clock.offset(),
    cutoff = %policy.cutoff,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
