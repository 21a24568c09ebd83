//! Services module
//!
//! Transfer logic built on top of blob sessions and handles.

pub mod files;
pub mod transfer;

pub use files::FileTransferService;
pub use transfer::{digest, stream_into, stream_out, TransferSummary};
