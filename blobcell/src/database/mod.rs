//! Database module
//!
//! This module provides connection setup and the placeholder allocation
//! step that must precede a streamed write:
//! - Shared connect options (WAL, busy timeout)
//! - Pool and single-connection constructors
//! - Zero-filled placeholder cells

pub mod placeholder;

pub use placeholder::{allocate_placeholder, insert_placeholder, quote_identifier};

use crate::config::{BUSY_TIMEOUT_SECS, POOL_MAX_CONNECTIONS};
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Build connection options shared by pooled and standalone connections.
fn connect_options(db_path: &Path) -> std::result::Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display())).map(
        |opts| {
            opts.create_if_missing(true)
                .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS))
                .journal_mode(SqliteJournalMode::Wal)
        },
    )
}

fn ensure_parent(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Create a database connection pool.
///
/// Streaming needs one connection per session; acquire it from the pool
/// and pass `&mut *conn` to [`crate::blob::BlobSession::lock`].
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Creating database connection pool at: {:?}", db_path);

    ensure_parent(db_path)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(POOL_MAX_CONNECTIONS)
        .connect_with(connect_options(db_path)?)
        .await?;

    tracing::info!("Database pool created successfully");

    Ok(pool)
}

/// Open a single standalone connection
pub async fn open_connection(db_path: &Path) -> Result<SqliteConnection> {
    tracing::debug!("Opening database connection at: {:?}", db_path);

    ensure_parent(db_path)?;

    let conn = connect_options(db_path)?.connect().await?;
    Ok(conn)
}
