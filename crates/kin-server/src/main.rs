//! kin-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API over HTTP.
//!
//! # Account administration
//!
//! Accounts are created and removed from the command line; the password is
//! read from stdin:
//!
//! ```text
//! cargo run -p kin-server -- --add-user tendai
//! cargo run -p kin-server -- --delete-user tendai
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use kin_core::{store::FamilyStore, user::NewUser};
use kin_server::{AppState, ServerConfig, auth::hash_password};
use kin_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Kin family-tree server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create an account with a password entered on stdin and exit.
  #[arg(long, value_name = "USERNAME", conflicts_with = "delete_user")]
  add_user: Option<String>,

  /// Contact address stored with `--add-user`.
  #[arg(long, requires = "add_user")]
  email: Option<String>,

  /// Delete an account and everything it owns, then exit.
  #[arg(long, value_name = "USERNAME")]
  delete_user: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
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
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("KIN"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(username) = cli.add_user {
    return add_user(&store, username, cli.email.unwrap_or_default()).await;
  }
  if let Some(username) = cli.delete_user {
    return delete_user(&store, username).await;
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(server_cfg),
  };
  let app = kin_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn add_user(store: &SqliteStore, username: String, email: String) -> anyhow::Result<()> {
  let password = read_password()?;
  anyhow::ensure!(!password.is_empty(), "password must not be empty");
  let password_hash =
    hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  let user = store
    .create_user(NewUser { username, email, password_hash })
    .await
    .context("failed to create user")?;
  tracing::info!(id = user.id, username = %user.username, "created user");
  Ok(())
}

async fn delete_user(store: &SqliteStore, username: String) -> anyhow::Result<()> {
  let creds = store
    .user_credentials(username.clone())
    .await
    .context("failed to look up user")?
    .with_context(|| format!("no such user: {username}"))?;
  store
    .delete_user(creds.user.id)
    .await
    .context("failed to delete user")?;
  tracing::info!(id = creds.user.id, username = %username, "deleted user and their records");
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
