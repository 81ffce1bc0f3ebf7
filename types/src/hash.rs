//! 32-byte hash/key newtype shared by block ids, transaction ids, key images
//! and one-time public keys.

use core::fmt;
use core::str::FromStr;

/// A 32-byte hash, key-image, or public key.
///
/// The reference implementation uses a bare `crypto::hash` typedef for all
/// of these; we use a single newtype so `Display`/`FromStr`/hex plumbing is
/// written once instead of per call-site.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Hash(pub [u8; 32]);

/// Error returned when parsing a [`Hash`] from a hex string.
#[derive(Debug, thiserror::Error)]
pub enum HashParseError {
    /// The string was not valid hex.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    /// The decoded bytes were not exactly 32 bytes long.
    #[error("expected 32 bytes, got {0}")]
    WrongLength(usize),
}

impl Hash {
    /// The all-zero hash, used as the `previous_block_hash` of genesis.
    pub const ZERO: Self = Self([0; 32]);

    /// Returns the hash as a byte slice.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical form is lower-case only; the reference's `isHex` accepted
        // malformed uppercase input by accident, which we do not replicate.
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({self})")
    }
}

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let len = bytes.len();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HashParseError::WrongLength(len))?;
        Ok(Self(array))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        let h = Hash([7; 32]);
        let parsed: Hash = h.to_string().parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn rejects_short_input() {
        let err = "aabb".parse::<Hash>().unwrap_err();
        assert!(matches!(err, HashParseError::WrongLength(2)));
    }
}
