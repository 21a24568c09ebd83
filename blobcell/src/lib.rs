//! blobcell library
//!
//! Incremental BLOB I/O against SQLite cells: open a streaming channel on
//! one (table, column, row) cell and move byte ranges between it and
//! caller-owned buffers, without loading whole values into memory.

pub mod blob;
pub mod config;
pub mod database;
pub mod error;
pub mod services;

pub use blob::{AccessMode, BlobHandle, BlobSession, BlobStream, Locator};
pub use error::{BlobError, Result};
