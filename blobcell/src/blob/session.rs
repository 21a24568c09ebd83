//! Blob sessions
//!
//! A session holds the sqlx connection lock and exposes the raw SQLite
//! connection to the streaming layer. Acquiring it is the only async step;
//! every blob operation after that is a synchronous call on this thread.

use super::handle::{AccessMode, BlobHandle};
use super::Locator;
use crate::config::MAIN_SCHEMA;
use crate::error::{BlobError, Result};
use libsqlite3_sys as ffi;
use sqlx::sqlite::{LockedSqliteHandle, SqliteConnection};
use std::ffi::CString;
use std::ptr::NonNull;

/// Exclusive access to one connection for BLOB streaming
pub struct BlobSession<'c> {
    _lock: LockedSqliteHandle<'c>,
    db: NonNull<ffi::sqlite3>,
    schema: String,
    schema_c: CString,
}

impl<'c> BlobSession<'c> {
    /// Lock `conn` and address cells in the `main` database
    pub async fn lock(conn: &'c mut SqliteConnection) -> Result<Self> {
        Self::lock_with_schema(conn, MAIN_SCHEMA).await
    }

    /// Lock `conn` and address cells in an attached database
    pub async fn lock_with_schema(conn: &'c mut SqliteConnection, schema: &str) -> Result<Self> {
        let schema_c = CString::new(schema).map_err(|_| BlobError::Storage {
            code: ffi::SQLITE_MISUSE,
            message: format!("schema name contains NUL byte: {:?}", schema),
        })?;

        let mut lock = conn.lock_handle().await?;
        let db = lock.as_raw_handle();

        tracing::debug!("Blob session locked on schema: {}", schema);

        Ok(Self {
            _lock: lock,
            db,
            schema: schema.to_string(),
            schema_c,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Bind a streaming channel to the cell at `locator`.
    ///
    /// Fails with [`BlobError::NotFound`] when the row is missing or the cell
    /// is NULL, [`BlobError::Schema`] when the table or column cannot be
    /// streamed, and [`BlobError::Storage`] for anything the engine reports
    /// beyond that. The returned handle borrows the session, so it cannot
    /// outlive the connection lock.
    pub fn open(&self, locator: &Locator, mode: AccessMode) -> Result<BlobHandle<'_>> {
        BlobHandle::open(self.db, &self.schema_c, locator, mode)
    }
}
