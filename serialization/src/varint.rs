//! The portable-storage variable-length integer encoding: the low two bits
//! of the first byte select a 1/2/4/8-byte width, the value is shifted left
//! by two to make room.

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

const FITS_IN_ONE_BYTE: u64 = (1 << 6) - 1;
const FITS_IN_TWO_BYTES: u64 = (1 << 14) - 1;
const FITS_IN_FOUR_BYTES: u64 = (1 << 30) - 1;

/// Reads a varint from `r`.
pub fn read_varint<B: Buf>(r: &mut B) -> Result<u64> {
    if !r.has_remaining() {
        return Err(Error::UnexpectedEof);
    }

    let first = r.get_u8();
    let len = 1usize << (first & 0b11);

    if r.remaining() < len - 1 {
        return Err(Error::UnexpectedEof);
    }

    let mut value = u64::from(first >> 2);
    for i in 1..len {
        value |= u64::from(r.get_u8()) << (((i - 1) * 8) + 6);
    }
    Ok(value)
}

/// Writes `value` to `w` as a varint.
pub fn write_varint<B: BufMut>(value: u64, w: &mut B) {
    let size_marker: u64 = match value {
        0..=FITS_IN_ONE_BYTE => 0,
        v if v <= FITS_IN_TWO_BYTES => 1,
        v if v <= FITS_IN_FOUR_BYTES => 2,
        _ => 3,
    };

    let encoded = (value << 2) | size_marker;
    match size_marker {
        0 => w.put_u8(encoded as u8),
        1 => w.put_u16_le(encoded as u16),
        2 => w.put_u32_le(encoded as u32),
        _ => w.put_u64_le(encoded),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip(value: u64) {
        let mut buf = Vec::new();
        write_varint(value, &mut buf);
        let mut slice = buf.as_slice();
        assert_eq!(read_varint(&mut slice).unwrap(), value);
    }

    #[test]
    fn boundaries_round_trip() {
        for value in [
            0,
            FITS_IN_ONE_BYTE,
            FITS_IN_ONE_BYTE + 1,
            FITS_IN_TWO_BYTES,
            FITS_IN_TWO_BYTES + 1,
            FITS_IN_FOUR_BYTES,
            FITS_IN_FOUR_BYTES + 1,
            u64::MAX,
        ] {
            round_trip(value);
        }
    }
}
