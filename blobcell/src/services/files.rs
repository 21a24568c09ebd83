//! File transfer service
//!
//! Moves files in and out of database cells through a connection pool.
//! Integrates placeholder allocation, blob sessions and chunked transfers.

use super::transfer::{digest, TransferSummary};
use crate::blob::{AccessMode, BlobSession, Locator};
use crate::config::{effective_chunk_size, DEFAULT_CHUNK_SIZE, MAX_BLOB_SIZE};
use crate::database::insert_placeholder;
use crate::error::{BlobError, Result};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Service for streaming files into and out of cells
///
/// File I/O goes through `tokio::fs`; only the blob calls between chunks run
/// synchronously on the connection.
#[derive(Clone)]
pub struct FileTransferService {
    pool: SqlitePool,
    chunk_size: usize,
}

impl FileTransferService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Store a file in a new row of `table`, returning the cell and transfer summary.
    ///
    /// The placeholder row and its content are committed together. If the
    /// file cannot be read in full the row is rolled back.
    pub async fn import_file(
        &self,
        table: &str,
        column: &str,
        path: &Path,
    ) -> Result<(Locator, TransferSummary)> {
        let file = File::open(path).await?;
        let len = usize::try_from(file.metadata().await?.len()).unwrap_or(usize::MAX);
        if len > MAX_BLOB_SIZE {
            return Err(BlobError::Range {
                offset: 0,
                length: len,
                size: MAX_BLOB_SIZE,
            });
        }

        tracing::info!("Importing {:?} into {}.{} ({} bytes)", path, table, column, len);

        let mut tx = self.pool.begin().await?;
        let row_id = insert_placeholder(&mut *tx, table, column, len).await?;
        let locator = Locator::new(table, column, row_id);

        match fill_cell(&mut *tx, &locator, file, len, self.chunk_size).await {
            Ok(summary) => {
                tx.commit().await?;
                tracing::info!("Imported {} as {} ({})", locator, summary.bytes, summary.sha256);
                Ok((locator, summary))
            }
            Err(e) => {
                tracing::warn!("Import of {:?} into {} failed, rolling back: {}", path, locator, e);
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Write the cell at `locator` to `path`.
    ///
    /// Returns `None` without touching `path` when the row is missing or NULL.
    pub async fn export_file(&self, locator: &Locator, path: &Path) -> Result<Option<TransferSummary>> {
        // One read transaction so every chunk sees the same cell
        let mut tx = self.pool.begin().await?;

        let size = {
            let session = BlobSession::lock(&mut *tx).await?;
            let size = match session.open(locator, AccessMode::ReadOnly) {
                Ok(handle) => handle.size()?,
                Err(e) if e.is_not_found() => {
                    tracing::info!("Nothing to export at {}", locator);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            size
        };

        tracing::info!("Exporting {} to {:?} ({} bytes)", locator, path, size);

        let mut file = File::create(path).await?;
        let summary = drain_cell(&mut *tx, locator, size, &mut file, self.chunk_size).await?;
        file.sync_all().await?;
        tx.commit().await?;

        Ok(Some(summary))
    }

    /// Size of the cell at `locator`, or `None` when missing or NULL
    pub async fn size(&self, locator: &Locator) -> Result<Option<usize>> {
        let mut conn = self.pool.acquire().await?;
        let session = BlobSession::lock(&mut *conn).await?;

        let size = match session.open(locator, AccessMode::ReadOnly) {
            Ok(handle) => Some(handle.size()?),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        Ok(size)
    }

    /// SHA-256 of the cell at `locator`, or `None` when missing or NULL
    pub async fn checksum(&self, locator: &Locator) -> Result<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        let session = BlobSession::lock(&mut *conn).await?;

        let handle = match session.open(locator, AccessMode::ReadOnly) {
            Ok(handle) => handle,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let sha256 = digest(&handle, self.chunk_size)?;
        Ok(Some(sha256))
    }
}

/// Copy `file` into the pre-sized cell, one chunk per blob handle.
///
/// Fails if the file yields fewer bytes than `len`; more bytes than `len`
/// fail the write with [`BlobError::Range`].
async fn fill_cell(
    conn: &mut SqliteConnection,
    locator: &Locator,
    mut file: File,
    len: usize,
    chunk_size: usize,
) -> Result<TransferSummary> {
    let mut chunk = vec![0u8; effective_chunk_size(chunk_size)];
    let mut hasher = Sha256::new();
    let mut offset = 0usize;

    loop {
        let n = file.read(&mut chunk).await?;
        if n == 0 {
            break;
        }

        let session = BlobSession::lock(&mut *conn).await?;
        let mut handle = session.open(locator, AccessMode::ReadWrite)?;
        handle.write(&chunk, 0, n, offset)?;
        handle.close()?;

        hasher.update(&chunk[..n]);
        offset += n;
    }

    if offset != len {
        return Err(BlobError::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("file ended after {} of {} bytes", offset, len),
        )));
    }

    tracing::debug!("Streamed {} bytes into {}", offset, locator);

    Ok(TransferSummary {
        bytes: offset as u64,
        sha256: format!("{:x}", hasher.finalize()),
    })
}

/// Copy the first `size` bytes of the cell into `file`, one chunk per blob handle.
async fn drain_cell(
    conn: &mut SqliteConnection,
    locator: &Locator,
    size: usize,
    file: &mut File,
    chunk_size: usize,
) -> Result<TransferSummary> {
    let mut chunk = vec![0u8; effective_chunk_size(chunk_size).min(size.max(1))];
    let mut hasher = Sha256::new();
    let mut offset = 0usize;

    while offset < size {
        let n = chunk.len().min(size - offset);

        {
            let session = BlobSession::lock(&mut *conn).await?;
            let mut handle = session.open(locator, AccessMode::ReadOnly)?;
            handle.read(&mut chunk, 0, n, offset)?;
            handle.close()?;
        }

        file.write_all(&chunk[..n]).await?;
        hasher.update(&chunk[..n]);
        offset += n;
    }
    file.flush().await?;

    tracing::debug!("Streamed {} bytes out of {}", offset, locator);

    Ok(TransferSummary {
        bytes: offset as u64,
        sha256: format!("{:x}", hasher.finalize()),
    })
}
