//! Whole-cell convenience operations
//!
//! Each call opens a handle, moves one contiguous range, and closes the handle
//! on every exit path. Missing rows and NULL cells are an ordinary outcome
//! here, not an error.

use super::handle::AccessMode;
use super::{BlobSession, Locator};
use crate::error::Result;

impl BlobSession<'_> {
    /// Copy the leading `min(buffer.len(), size)` bytes of the cell into `buffer`.
    ///
    /// Returns the number of bytes copied: `0` for a missing row or NULL cell,
    /// and a truncated count when the cell is larger than the buffer. Bytes of
    /// `buffer` past the returned count are left as they were.
    pub fn read_whole(&self, locator: &Locator, buffer: &mut [u8]) -> Result<usize> {
        let mut handle = match self.open(locator, AccessMode::ReadOnly) {
            Ok(handle) => handle,
            Err(e) if e.is_not_found() => {
                tracing::debug!("No blob to read at {}", locator);
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let size = handle.size()?;
        let length = buffer.len().min(size);
        if length < size {
            tracing::debug!("Truncating read of {} from {} to {} bytes", locator, size, length);
        }

        handle.read(buffer, 0, length, 0)?;
        handle.close()?;

        Ok(length)
    }

    /// Write `buffer[..length]` at the start of a pre-sized cell.
    ///
    /// Returns `false` when the row is missing, the cell is NULL, or the cell
    /// holds fewer than `length` bytes. The cell must have been allocated
    /// beforehand (see [`crate::database::insert_placeholder`]); a larger
    /// cell keeps its trailing bytes.
    pub fn write_whole(&self, locator: &Locator, buffer: &[u8], length: usize) -> Result<bool> {
        let mut handle = match self.open(locator, AccessMode::ReadWrite) {
            Ok(handle) => handle,
            Err(e) if e.is_not_found() => {
                tracing::debug!("No blob to write at {}", locator);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let size = handle.size()?;
        if size < length {
            tracing::debug!("Blob {} holds {} bytes, cannot take {}", locator, size, length);
            return Ok(false);
        }

        handle.write(buffer, 0, length, 0)?;
        handle.close()?;

        Ok(true)
    }
}
