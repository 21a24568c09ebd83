//! Blob handles
//!
//! A handle is an open streaming channel on one cell. Its size is fixed for
//! as long as it stays bound to that cell; content can change, length cannot.
//! Reads and writes are addressed by explicit blob offsets and copy between
//! the channel and a sub-range of a caller-owned buffer.

use super::native;
use super::Locator;
use crate::error::{BlobError, Result};
use libsqlite3_sys as ffi;
use std::ffi::{c_int, CStr, CString};
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Access mode requested at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn is_writable(self) -> bool {
        matches!(self, AccessMode::ReadWrite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Open,
    Closed,
}

/// Open streaming channel on one cell
///
/// Dropping an open handle closes it. Call [`BlobHandle::close`] to observe
/// the close status instead of having it logged.
pub struct BlobHandle<'s> {
    db: NonNull<ffi::sqlite3>,
    raw: Option<NonNull<ffi::sqlite3_blob>>,
    locator: Locator,
    size: usize,
    writable: bool,
    _session: PhantomData<&'s ()>,
}

impl<'s> BlobHandle<'s> {
    pub(crate) fn open(
        db: NonNull<ffi::sqlite3>,
        schema: &CStr,
        locator: &Locator,
        mode: AccessMode,
    ) -> Result<Self> {
        let table = identifier(locator, &locator.table)?;
        let column = identifier(locator, &locator.column)?;

        let raw = native::blob_open(db, schema, &table, &column, locator.row_id, mode.is_writable())
            .map_err(|e| BlobError::from_open(locator, e))?;
        let size = native::blob_bytes(raw);

        tracing::debug!("Opened blob handle: {} ({:?}, {} bytes)", locator, mode, size);

        Ok(Self {
            db,
            raw: Some(raw),
            locator: locator.clone(),
            size,
            writable: mode.is_writable(),
            _session: PhantomData,
        })
    }

    /// Size of the bound cell in bytes
    ///
    /// Fails with [`BlobError::UseAfterClose`] once the handle is closed.
    pub fn size(&self) -> Result<usize> {
        self.channel()?;
        Ok(self.size)
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn state(&self) -> HandleState {
        if self.raw.is_some() {
            HandleState::Open
        } else {
            HandleState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    /// Copy `length` bytes starting at `blob_offset` into
    /// `buffer[buffer_offset..buffer_offset + length]`.
    ///
    /// Returns the number of bytes copied, which is always `length`. Both
    /// ranges are validated before the engine is called; a failed read leaves
    /// the buffer untouched.
    pub fn read(
        &self,
        buffer: &mut [u8],
        buffer_offset: usize,
        length: usize,
        blob_offset: usize,
    ) -> Result<usize> {
        let raw = self.channel()?;
        let end = check_buffer(buffer.len(), buffer_offset, length)?;
        let offset = self.check_blob(blob_offset, length)?;

        if length == 0 {
            return Ok(0);
        }

        native::blob_read(self.db, raw, &mut buffer[buffer_offset..end], offset)?;

        tracing::trace!("Read {} bytes at {} from {}", length, blob_offset, self.locator);

        Ok(length)
    }

    /// Fill all of `dst` from `blob_offset`
    pub fn read_at(&self, blob_offset: usize, dst: &mut [u8]) -> Result<usize> {
        let length = dst.len();
        self.read(dst, 0, length, blob_offset)
    }

    /// Copy `buffer[buffer_offset..buffer_offset + length]` into the cell at
    /// `blob_offset`.
    ///
    /// The cell never grows: a range reaching past [`BlobHandle::size`] fails
    /// with [`BlobError::Range`] and nothing is written.
    pub fn write(
        &mut self,
        buffer: &[u8],
        buffer_offset: usize,
        length: usize,
        blob_offset: usize,
    ) -> Result<()> {
        let raw = self.channel()?;
        if !self.writable {
            return Err(BlobError::NotWritable(self.locator.clone()));
        }
        let end = check_buffer(buffer.len(), buffer_offset, length)?;
        let offset = self.check_blob(blob_offset, length)?;

        if length == 0 {
            return Ok(());
        }

        native::blob_write(self.db, raw, &buffer[buffer_offset..end], offset)?;

        tracing::trace!("Wrote {} bytes at {} to {}", length, blob_offset, self.locator);

        Ok(())
    }

    /// Write all of `src` at `blob_offset`
    pub fn write_at(&mut self, blob_offset: usize, src: &[u8]) -> Result<()> {
        self.write(src, 0, src.len(), blob_offset)
    }

    /// Move this handle to another row of the same table and column.
    ///
    /// The cached size is refreshed from the new cell. If the engine rejects
    /// the move the handle stays open but unusable until closed.
    pub fn reopen(&mut self, row_id: i64) -> Result<()> {
        let raw = self.channel()?;
        let target = self.locator.with_row(row_id);

        native::blob_reopen(self.db, raw, row_id).map_err(|e| BlobError::from_open(&target, e))?;

        self.size = native::blob_bytes(raw);
        tracing::debug!("Reopened blob handle: {} -> {} ({} bytes)", self.locator, target, self.size);
        self.locator = target;

        Ok(())
    }

    /// Release the channel. Closing a closed handle does nothing.
    pub fn close(&mut self) -> Result<()> {
        let Some(raw) = self.raw.take() else {
            return Ok(());
        };

        tracing::debug!("Closing blob handle: {}", self.locator);
        native::blob_close(self.db, raw)?;

        Ok(())
    }

    fn channel(&self) -> Result<NonNull<ffi::sqlite3_blob>> {
        self.raw
            .ok_or_else(|| BlobError::UseAfterClose(self.locator.clone()))
    }

    fn check_blob(&self, offset: usize, length: usize) -> Result<c_int> {
        let out_of_range = || BlobError::Range {
            offset,
            length,
            size: self.size,
        };

        match offset.checked_add(length) {
            Some(end) if end <= self.size => c_int::try_from(offset).map_err(|_| out_of_range()),
            _ => Err(out_of_range()),
        }
    }
}

impl Drop for BlobHandle<'_> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            if let Err(e) = native::blob_close(self.db, raw) {
                tracing::warn!("Failed to close blob handle {}: {}", self.locator, e.message);
            }
        }
    }
}

impl std::fmt::Debug for BlobHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobHandle")
            .field("locator", &self.locator)
            .field("size", &self.size)
            .field("writable", &self.writable)
            .field("state", &self.state())
            .finish()
    }
}

/// Validate a caller buffer sub-range, returning its end
fn check_buffer(capacity: usize, offset: usize, length: usize) -> Result<usize> {
    match offset.checked_add(length) {
        Some(end) if end <= capacity => Ok(end),
        _ => Err(BlobError::BufferRange {
            offset,
            length,
            capacity,
        }),
    }
}

fn identifier(locator: &Locator, name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| BlobError::Schema {
        locator: locator.clone(),
        message: format!("identifier contains NUL byte: {:?}", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobSession;
    use sqlx::sqlite::SqliteConnection;
    use sqlx::Connection;

    async fn test_connection() -> SqliteConnection {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();

        sqlx::query("CREATE TABLE images (id INTEGER PRIMARY KEY, name TEXT, data BLOB)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO images (id, name, data) VALUES (1, 'hello', CAST('Hello, World!' AS BLOB))")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO images (id, name, data) VALUES (2, 'zeros', zeroblob(8))")
            .execute(&mut conn)
            .await
            .unwrap();

        conn
    }

    #[test]
    fn test_check_buffer() {
        assert_eq!(check_buffer(10, 2, 8).unwrap(), 10);
        assert!(matches!(
            check_buffer(10, 3, 8),
            Err(BlobError::BufferRange { capacity: 10, .. })
        ));
        assert!(check_buffer(10, usize::MAX, 2).is_err());
    }

    #[tokio::test]
    async fn test_read_into_buffer_offset() {
        let mut conn = test_connection().await;
        let session = BlobSession::lock(&mut conn).await.unwrap();
        let handle = session
            .open(&Locator::new("images", "data", 1), AccessMode::ReadOnly)
            .unwrap();

        let mut buffer = [0xAAu8; 10];
        let n = handle.read(&mut buffer, 3, 5, 7).unwrap();

        assert_eq!(n, 5);
        assert_eq!(&buffer[..3], &[0xAA; 3]);
        assert_eq!(&buffer[3..8], b"World");
        assert_eq!(&buffer[8..], &[0xAA; 2]);
    }

    #[tokio::test]
    async fn test_read_past_end_is_range_error() {
        let mut conn = test_connection().await;
        let session = BlobSession::lock(&mut conn).await.unwrap();
        let handle = session
            .open(&Locator::new("images", "data", 1), AccessMode::ReadOnly)
            .unwrap();

        let mut buffer = [0u8; 32];
        let result = handle.read(&mut buffer, 0, 14, 0);
        assert!(matches!(
            result,
            Err(BlobError::Range {
                offset: 0,
                length: 14,
                size: 13
            })
        ));
        assert_eq!(buffer, [0u8; 32]);

        // Empty read at the very end is in range
        assert_eq!(handle.read(&mut buffer, 0, 0, 13).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let mut conn = test_connection().await;
        let session = BlobSession::lock(&mut conn).await.unwrap();
        let locator = Locator::new("images", "data", 2);

        let mut handle = session.open(&locator, AccessMode::ReadWrite).unwrap();
        handle.write(b"xxABCDxx", 2, 4, 3).unwrap();
        handle.close().unwrap();

        let handle = session.open(&locator, AccessMode::ReadOnly).unwrap();
        let mut out = [0u8; 8];
        handle.read_at(0, &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, b'A', b'B', b'C', b'D', 0]);
    }

    #[tokio::test]
    async fn test_write_never_grows_cell() {
        let mut conn = test_connection().await;
        let session = BlobSession::lock(&mut conn).await.unwrap();
        let mut handle = session
            .open(&Locator::new("images", "data", 2), AccessMode::ReadWrite)
            .unwrap();

        let result = handle.write_at(4, &[1u8; 5]);
        assert!(matches!(result, Err(BlobError::Range { size: 8, .. })));
        assert_eq!(handle.size().unwrap(), 8);

        let mut out = [0xFFu8; 8];
        handle.read_at(0, &mut out).unwrap();
        assert_eq!(out, [0u8; 8]);
    }

    #[tokio::test]
    async fn test_write_on_read_only_handle() {
        let mut conn = test_connection().await;
        let session = BlobSession::lock(&mut conn).await.unwrap();
        let mut handle = session
            .open(&Locator::new("images", "data", 2), AccessMode::ReadOnly)
            .unwrap();

        let result = handle.write_at(0, b"no");
        assert!(matches!(result, Err(BlobError::NotWritable(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_terminal() {
        let mut conn = test_connection().await;
        let session = BlobSession::lock(&mut conn).await.unwrap();
        let mut handle = session
            .open(&Locator::new("images", "data", 1), AccessMode::ReadWrite)
            .unwrap();

        assert_eq!(handle.state(), HandleState::Open);
        handle.close().unwrap();
        assert_eq!(handle.state(), HandleState::Closed);
        handle.close().unwrap();

        assert!(matches!(handle.size(), Err(BlobError::UseAfterClose(_))));

        let mut buffer = [0u8; 4];
        assert!(matches!(
            handle.read_at(0, &mut buffer),
            Err(BlobError::UseAfterClose(_))
        ));
        assert!(matches!(
            handle.write_at(0, b"abcd"),
            Err(BlobError::UseAfterClose(_))
        ));
        assert!(matches!(handle.reopen(2), Err(BlobError::UseAfterClose(_))));
    }

    #[tokio::test]
    async fn test_reopen_moves_to_other_row() {
        let mut conn = test_connection().await;
        let session = BlobSession::lock(&mut conn).await.unwrap();
        let mut handle = session
            .open(&Locator::new("images", "data", 1), AccessMode::ReadOnly)
            .unwrap();
        assert_eq!(handle.size().unwrap(), 13);

        handle.reopen(2).unwrap();
        assert_eq!(handle.size().unwrap(), 8);
        assert_eq!(handle.locator().row_id, 2);

        let result = handle.reopen(99);
        assert!(matches!(result, Err(BlobError::NotFound(ref l)) if l.row_id == 99));
        handle.close().unwrap();
    }

    #[tokio::test]
    async fn test_open_failures() {
        let mut conn = test_connection().await;
        sqlx::query("INSERT INTO images (id, name, data) VALUES (3, 'empty', NULL)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO images (id, name, data) VALUES (4, 'number', 42)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE tags (name TEXT PRIMARY KEY, icon BLOB) WITHOUT ROWID")
            .execute(&mut conn)
            .await
            .unwrap();

        let session = BlobSession::lock(&mut conn).await.unwrap();
        let open = |table: &str, column: &str, row: i64| {
            session
                .open(&Locator::new(table, column, row), AccessMode::ReadOnly)
                .map(|_| ())
        };

        assert!(matches!(open("images", "data", 404), Err(BlobError::NotFound(_))));
        assert!(matches!(open("images", "data", 3), Err(BlobError::NotFound(_))));
        assert!(matches!(open("images", "data", 4), Err(BlobError::Schema { .. })));
        assert!(matches!(open("images", "missing", 1), Err(BlobError::Schema { .. })));
        assert!(matches!(open("nowhere", "data", 1), Err(BlobError::Schema { .. })));
        assert!(matches!(open("images", "da\0ta", 1), Err(BlobError::Schema { .. })));
        assert!(matches!(open("tags", "icon", 1), Err(BlobError::Schema { .. })));
    }

    #[tokio::test]
    async fn test_independent_handles() {
        let mut conn = test_connection().await;
        let session = BlobSession::lock(&mut conn).await.unwrap();

        let reader = session
            .open(&Locator::new("images", "data", 1), AccessMode::ReadOnly)
            .unwrap();
        let mut writer = session
            .open(&Locator::new("images", "data", 2), AccessMode::ReadWrite)
            .unwrap();

        writer.write_at(0, &[9u8; 8]).unwrap();

        let mut out = [0u8; 13];
        reader.read_at(0, &mut out).unwrap();
        assert_eq!(&out, b"Hello, World!");
    }
}
