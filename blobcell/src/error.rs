//! Error types for blobcell
//!
//! All errors use thiserror for structured error handling.
//! Native failures are classified into the streaming taxonomy here.

use crate::blob::native::{NativeError, ResultCode};
use crate::blob::Locator;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlobError {
    /// Row absent, or the cell holds NULL.
    #[error("Blob not found: {0}")]
    NotFound(Locator),

    #[error("Range error: offset {offset} + length {length} exceeds blob size {size}")]
    Range {
        offset: usize,
        length: usize,
        size: usize,
    },

    #[error("Buffer range error: offset {offset} + length {length} exceeds buffer capacity {capacity}")]
    BufferRange {
        offset: usize,
        length: usize,
        capacity: usize,
    },

    #[error("Schema error for {locator}: {message}")]
    Schema { locator: Locator, message: String },

    /// Underlying storage failure, with the engine's result code.
    #[error("Storage error (code {code}): {message}")]
    Storage { code: i32, message: String },

    #[error("Blob handle for {0} was opened read-only")]
    NotWritable(Locator),

    #[error("Blob handle for {0} is closed")]
    UseAfterClose(Locator),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    /// Classify a failed `sqlite3_blob_open` / `sqlite3_blob_reopen`.
    pub(crate) fn from_open(locator: &Locator, err: NativeError) -> Self {
        if err.result_code() != ResultCode::Error {
            return BlobError::from(err);
        }

        let message = err.message.as_str();

        if message.starts_with("no such rowid") || message == "cannot open value of type null" {
            BlobError::NotFound(locator.clone())
        } else if is_schema_message(message) {
            BlobError::Schema {
                locator: locator.clone(),
                message: err.message,
            }
        } else {
            BlobError::from(err)
        }
    }

    /// The engine result code this error corresponds to.
    pub fn result_code(&self) -> ResultCode {
        match self {
            BlobError::NotFound(_) => ResultCode::NotFound,
            BlobError::Range { .. } | BlobError::BufferRange { .. } => ResultCode::Range,
            BlobError::Schema { .. } => ResultCode::Error,
            BlobError::Storage { code, .. } => ResultCode::from_raw(*code),
            BlobError::NotWritable(_) => ResultCode::ReadOnly,
            BlobError::UseAfterClose(_) => ResultCode::Misuse,
            BlobError::Database(_) | BlobError::Io(_) => ResultCode::Error,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound(_))
    }
}

impl From<NativeError> for BlobError {
    fn from(err: NativeError) -> Self {
        BlobError::Storage {
            code: err.code,
            message: err.message,
        }
    }
}

impl From<BlobError> for std::io::Error {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::Io(e) => e,
            BlobError::Range { .. } | BlobError::BufferRange { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
            }
            other => std::io::Error::other(other),
        }
    }
}

fn is_schema_message(message: &str) -> bool {
    const PREFIXES: &[&str] = &[
        "no such table",
        "no such column",
        "cannot open value of type",
        "cannot open virtual table",
        "cannot open table without rowid",
        "cannot open view",
        "cannot open indexed column",
        "cannot open foreign key column",
    ];

    PREFIXES.iter().any(|prefix| message.starts_with(prefix))
}

impl serde::Serialize for BlobError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BlobError>;
