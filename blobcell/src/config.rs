//! Configuration constants
//!
//! Central location for engine limits and defaults used by the
//! streaming layer, the transfer services and the command line.

// ===== Engine =====

/// Schema name of the primary database on a SQLite connection
pub const MAIN_SCHEMA: &str = "main";

/// Largest BLOB the incremental I/O API can address.
/// Offsets and lengths are C `int` on the engine side.
pub const MAX_BLOB_SIZE: usize = i32::MAX as usize;

/// How long a connection waits on a locked database before failing, in seconds
pub const BUSY_TIMEOUT_SECS: u64 = 5;

// ===== Transfers =====

/// Default chunk size for streamed transfers (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound for a caller-chosen chunk size (16 MiB).
/// Larger chunks defeat the point of streaming.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

// ===== Connection pool =====

/// Connections kept by [`crate::database::create_pool`]
pub const POOL_MAX_CONNECTIONS: u32 = 5;

/// Clamp a requested chunk size into `1..=MAX_CHUNK_SIZE`
pub fn effective_chunk_size(requested: usize) -> usize {
    requested.clamp(1, MAX_CHUNK_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_chunk_size() {
        assert_eq!(effective_chunk_size(0), 1);
        assert_eq!(effective_chunk_size(DEFAULT_CHUNK_SIZE), DEFAULT_CHUNK_SIZE);
        assert_eq!(effective_chunk_size(usize::MAX), MAX_CHUNK_SIZE);
    }
}
