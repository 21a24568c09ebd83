//! Blob streaming module
//!
//! Incremental, chunked I/O against single SQLite cells. Values are never
//! materialized: callers supply the buffers and the byte ranges.
//!
//! Lifecycle: [`BlobSession::lock`] (async, once per connection) ->
//! [`BlobSession::open`] -> [`BlobHandle::read`] / [`BlobHandle::write`] ->
//! [`BlobHandle::close`] (or drop).

mod handle;
mod locator;
pub mod native;
mod session;
mod stream;
mod whole;

pub use handle::{AccessMode, BlobHandle, HandleState};
pub use locator::Locator;
pub use native::ResultCode;
pub use session::BlobSession;
pub use stream::BlobStream;
