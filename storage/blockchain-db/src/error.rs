//! Storage error type.
//!
//! Grounded in the taxonomy of `StorageIoError`/`StorageCorrupt`: any
//! failure to talk to disk is `Io`, any failure to trust what came back off
//! disk is `Corrupt`.

/// Errors produced by the paged block store or the generic snapshot files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying file could not be read from or written to.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The on-disk data violated an invariant the store relies on (index
    /// count disagrees with the items file size, a record failed to
    /// decode, ...).
    #[error("storage corrupt: {0}")]
    Corrupt(String),
}

/// Convenience result alias.
pub type Result<T> = core::result::Result<T, StorageError>;
