//! Thin wrappers over SQLite's incremental BLOB API
//!
//! Every `unsafe` call into `libsqlite3-sys` lives in this module. Callers
//! pass pointers obtained from a locked sqlx connection and a channel that
//! was returned by [`blob_open`] and not yet handed to [`blob_close`].

use libsqlite3_sys as ffi;
use std::ffi::{c_int, c_void, CStr};
use std::ptr::{self, NonNull};

/// SQLite primary result codes, re-exposed without reinterpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    Error,
    Abort,
    Busy,
    ReadOnly,
    IoErr,
    Corrupt,
    NotFound,
    Misuse,
    Range,
    Other(i32),
}

impl ResultCode {
    /// Map a raw (possibly extended) result code onto its primary code.
    pub fn from_raw(rc: c_int) -> Self {
        match rc & 0xff {
            ffi::SQLITE_OK => ResultCode::Ok,
            ffi::SQLITE_ERROR => ResultCode::Error,
            ffi::SQLITE_ABORT => ResultCode::Abort,
            ffi::SQLITE_BUSY => ResultCode::Busy,
            ffi::SQLITE_READONLY => ResultCode::ReadOnly,
            ffi::SQLITE_IOERR => ResultCode::IoErr,
            ffi::SQLITE_CORRUPT => ResultCode::Corrupt,
            ffi::SQLITE_NOTFOUND => ResultCode::NotFound,
            ffi::SQLITE_MISUSE => ResultCode::Misuse,
            ffi::SQLITE_RANGE => ResultCode::Range,
            _ => ResultCode::Other(rc),
        }
    }

    pub fn as_raw(self) -> c_int {
        match self {
            ResultCode::Ok => ffi::SQLITE_OK,
            ResultCode::Error => ffi::SQLITE_ERROR,
            ResultCode::Abort => ffi::SQLITE_ABORT,
            ResultCode::Busy => ffi::SQLITE_BUSY,
            ResultCode::ReadOnly => ffi::SQLITE_READONLY,
            ResultCode::IoErr => ffi::SQLITE_IOERR,
            ResultCode::Corrupt => ffi::SQLITE_CORRUPT,
            ResultCode::NotFound => ffi::SQLITE_NOTFOUND,
            ResultCode::Misuse => ffi::SQLITE_MISUSE,
            ResultCode::Range => ffi::SQLITE_RANGE,
            ResultCode::Other(rc) => rc,
        }
    }
}

/// A failed native call: the raw result code plus the engine's message.
#[derive(Debug, Clone)]
pub struct NativeError {
    pub code: c_int,
    pub message: String,
}

impl NativeError {
    /// Capture the connection's current error message for `rc`.
    fn from_db(db: NonNull<ffi::sqlite3>, rc: c_int) -> Self {
        // SAFETY: `db` is a live connection held under the sqlx handle lock.
        let message = unsafe {
            let msg = ffi::sqlite3_errmsg(db.as_ptr());
            if msg.is_null() {
                error_string(rc)
            } else {
                CStr::from_ptr(msg).to_string_lossy().into_owned()
            }
        };

        Self { code: rc, message }
    }

    pub fn result_code(&self) -> ResultCode {
        ResultCode::from_raw(self.code)
    }
}

/// Static English description of a result code.
fn error_string(rc: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a pointer to a static string (or NULL).
    unsafe {
        let msg = ffi::sqlite3_errstr(rc);
        if msg.is_null() {
            format!("sqlite result code {}", rc)
        } else {
            CStr::from_ptr(msg).to_string_lossy().into_owned()
        }
    }
}

pub(crate) fn blob_open(
    db: NonNull<ffi::sqlite3>,
    schema: &CStr,
    table: &CStr,
    column: &CStr,
    row_id: i64,
    writable: bool,
) -> Result<NonNull<ffi::sqlite3_blob>, NativeError> {
    let mut raw: *mut ffi::sqlite3_blob = ptr::null_mut();

    // SAFETY: all strings are NUL-terminated and outlive the call; `raw` is a
    // valid out-pointer. On failure SQLite leaves `raw` NULL.
    let rc = unsafe {
        ffi::sqlite3_blob_open(
            db.as_ptr(),
            schema.as_ptr(),
            table.as_ptr(),
            column.as_ptr(),
            row_id,
            c_int::from(writable),
            &mut raw,
        )
    };

    if rc != ffi::SQLITE_OK {
        return Err(NativeError::from_db(db, rc));
    }

    NonNull::new(raw).ok_or_else(|| NativeError {
        code: ffi::SQLITE_MISUSE,
        message: "sqlite3_blob_open returned no handle".to_string(),
    })
}

pub(crate) fn blob_reopen(
    db: NonNull<ffi::sqlite3>,
    blob: NonNull<ffi::sqlite3_blob>,
    row_id: i64,
) -> Result<(), NativeError> {
    // SAFETY: `blob` is an open channel on `db`.
    let rc = unsafe { ffi::sqlite3_blob_reopen(blob.as_ptr(), row_id) };
    check(db, rc)
}

pub(crate) fn blob_bytes(blob: NonNull<ffi::sqlite3_blob>) -> usize {
    // SAFETY: `blob` is an open channel. The engine never reports a negative size.
    let n = unsafe { ffi::sqlite3_blob_bytes(blob.as_ptr()) };
    usize::try_from(n).unwrap_or(0)
}

/// Copy `dst.len()` bytes starting at `offset`. Bounds are checked by the caller.
pub(crate) fn blob_read(
    db: NonNull<ffi::sqlite3>,
    blob: NonNull<ffi::sqlite3_blob>,
    dst: &mut [u8],
    offset: c_int,
) -> Result<(), NativeError> {
    let n = native_len(dst.len())?;

    // SAFETY: `dst` is valid for `n` writable bytes.
    let rc = unsafe { ffi::sqlite3_blob_read(blob.as_ptr(), dst.as_mut_ptr().cast::<c_void>(), n, offset) };
    check(db, rc)
}

/// Copy all of `src` into the channel at `offset`. Bounds are checked by the caller.
pub(crate) fn blob_write(
    db: NonNull<ffi::sqlite3>,
    blob: NonNull<ffi::sqlite3_blob>,
    src: &[u8],
    offset: c_int,
) -> Result<(), NativeError> {
    let n = native_len(src.len())?;

    // SAFETY: `src` is valid for `n` readable bytes.
    let rc = unsafe { ffi::sqlite3_blob_write(blob.as_ptr(), src.as_ptr().cast::<c_void>(), n, offset) };
    check(db, rc)
}

/// Release the channel. The pointer is invalid afterwards whatever the result.
pub(crate) fn blob_close(
    db: NonNull<ffi::sqlite3>,
    blob: NonNull<ffi::sqlite3_blob>,
) -> Result<(), NativeError> {
    // SAFETY: `blob` is open and is never used again by the caller.
    let rc = unsafe { ffi::sqlite3_blob_close(blob.as_ptr()) };
    check(db, rc)
}

fn check(db: NonNull<ffi::sqlite3>, rc: c_int) -> Result<(), NativeError> {
    if rc == ffi::SQLITE_OK {
        Ok(())
    } else {
        Err(NativeError::from_db(db, rc))
    }
}

fn native_len(len: usize) -> Result<c_int, NativeError> {
    c_int::try_from(len).map_err(|_| NativeError {
        code: ffi::SQLITE_RANGE,
        message: format!("length {} exceeds the engine's addressable range", len),
    })
}
