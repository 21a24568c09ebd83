//! Chunked transfers between `std::io` streams and cells
//!
//! Only one chunk is resident at a time; the SHA-256 of everything moved is
//! computed on the way through.

use crate::blob::BlobHandle;
use crate::config::effective_chunk_size;
use crate::error::{BlobError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::{ErrorKind, Read, Write};

/// Outcome of a streamed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the transferred bytes
    pub sha256: String,
}

/// Copy `reader` into the cell from offset 0, one chunk at a time.
///
/// Fails with [`BlobError::Range`] if the reader yields more bytes than the
/// cell holds; chunks written before that point stay written.
pub fn stream_into<R: Read>(
    handle: &mut BlobHandle<'_>,
    mut reader: R,
    chunk_size: usize,
) -> Result<TransferSummary> {
    let mut chunk = vec![0u8; effective_chunk_size(chunk_size)];
    let mut hasher = Sha256::new();
    let mut offset = 0usize;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(BlobError::Io(e)),
        };

        handle.write(&chunk, 0, n, offset)?;
        hasher.update(&chunk[..n]);
        offset += n;
    }

    tracing::debug!("Streamed {} bytes into {}", offset, handle.locator());

    Ok(TransferSummary {
        bytes: offset as u64,
        sha256: format!("{:x}", hasher.finalize()),
    })
}

/// Copy the whole cell into `writer`, one chunk at a time.
pub fn stream_out<W: Write>(
    handle: &BlobHandle<'_>,
    mut writer: W,
    chunk_size: usize,
) -> Result<TransferSummary> {
    let size = handle.size()?;
    let mut chunk = vec![0u8; effective_chunk_size(chunk_size).min(size.max(1))];
    let mut hasher = Sha256::new();
    let mut offset = 0usize;

    while offset < size {
        let n = chunk.len().min(size - offset);
        handle.read(&mut chunk, 0, n, offset)?;
        writer.write_all(&chunk[..n])?;
        hasher.update(&chunk[..n]);
        offset += n;
    }
    writer.flush()?;

    tracing::debug!("Streamed {} bytes out of {}", offset, handle.locator());

    Ok(TransferSummary {
        bytes: offset as u64,
        sha256: format!("{:x}", hasher.finalize()),
    })
}

/// SHA-256 of the cell's content without materializing it
pub fn digest(handle: &BlobHandle<'_>, chunk_size: usize) -> Result<String> {
    stream_out(handle, std::io::sink(), chunk_size).map(|summary| summary.sha256)
}
