//! Serialization error type.

/// Errors produced while encoding or decoding either codec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The buffer ran out of bytes before decoding finished.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// A length/count prefix exceeded a sane bound.
    #[error("length {0} exceeds maximum of {1}")]
    LengthTooLarge(u64, u64),
    /// The key-value binary header did not match.
    #[error("bad portable-storage header")]
    BadHeader,
    /// An unrecognised type marker byte.
    #[error("unknown marker byte {0:#x}")]
    UnknownMarker(u8),
    /// A string field was not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
    /// A numeric value did not fit the target integer type.
    #[error("integer out of range")]
    IntegerOutOfRange,
}

/// Convenience result alias.
pub type Result<T> = core::result::Result<T, Error>;
