//! The binary-packed codec: fixed field order, little-endian integers,
//! varint-prefixed collections. Used for on-disk [`BlockEntry`] records and
//! the memory pool snapshot.

use bytes::{Buf, BufMut};
use cryptonote_types::{
    Block, BlockEntry, BlockHeader, ExtraField, Hash, Input, Output, OutputTarget, RingSignature,
    Transaction,
};

use crate::error::{Error, Result};
use crate::varint::{read_varint, write_varint};

/// Anything that can be written to the binary-packed wire/disk format.
pub trait Encode {
    /// Appends `self`'s encoding to `w`.
    fn encode<B: BufMut>(&self, w: &mut B);
}

/// Anything that can be read from the binary-packed wire/disk format.
pub trait Decode: Sized {
    /// Reads a single value from the front of `r`.
    fn decode<B: Buf>(r: &mut B) -> Result<Self>;
}

/// Upper bound on any varint-prefixed collection length accepted while
/// decoding; guards against a corrupt length turning into an OOM attempt.
const MAX_COLLECTION_LEN: u64 = 50_000_000;

fn read_len<B: Buf>(r: &mut B) -> Result<usize> {
    let len = read_varint(r)?;
    if len > MAX_COLLECTION_LEN {
        return Err(Error::LengthTooLarge(len, MAX_COLLECTION_LEN));
    }
    Ok(len as usize)
}

fn require(r: &impl Buf, n: usize) -> Result<()> {
    if r.remaining() < n {
        Err(Error::UnexpectedEof)
    } else {
        Ok(())
    }
}

macro_rules! impl_primitive {
    ($ty:ty, $get:ident, $put:ident) => {
        impl Encode for $ty {
            fn encode<B: BufMut>(&self, w: &mut B) {
                w.$put(*self);
            }
        }
        impl Decode for $ty {
            fn decode<B: Buf>(r: &mut B) -> Result<Self> {
                require(r, core::mem::size_of::<$ty>())?;
                Ok(r.$get())
            }
        }
    };
}

impl_primitive!(u8, get_u8, put_u8);
impl_primitive!(u16, get_u16_le, put_u16_le);
impl_primitive!(u32, get_u32_le, put_u32_le);
impl_primitive!(u64, get_u64_le, put_u64_le);
impl_primitive!(i32, get_i32_le, put_i32_le);

impl Encode for u128 {
    fn encode<B: BufMut>(&self, w: &mut B) {
        w.put_u128_le(*self);
    }
}
impl Decode for u128 {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        require(r, 16)?;
        Ok(r.get_u128_le())
    }
}

impl Encode for Hash {
    fn encode<B: BufMut>(&self, w: &mut B) {
        w.put_slice(&self.0);
    }
}
impl Decode for Hash {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        require(r, 32)?;
        let mut bytes = [0u8; 32];
        r.copy_to_slice(&mut bytes);
        Ok(Self(bytes))
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<B: BufMut>(&self, w: &mut B) {
        write_varint(self.len() as u64, w);
        for item in self {
            item.encode(w);
        }
    }
}
impl<T: Decode> Decode for Vec<T> {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        let len = read_len(r)?;
        let mut out = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            out.push(T::decode(r)?);
        }
        Ok(out)
    }
}

fn encode_bytes<B: BufMut>(bytes: &[u8], w: &mut B) {
    write_varint(bytes.len() as u64, w);
    w.put_slice(bytes);
}

fn decode_bytes<B: Buf>(r: &mut B) -> Result<Vec<u8>> {
    let len = read_len(r)?;
    require(r, len)?;
    let mut out = vec![0u8; len];
    r.copy_to_slice(&mut out);
    Ok(out)
}

impl Encode for Input {
    fn encode<B: BufMut>(&self, w: &mut B) {
        match self {
            Self::Coinbase { height } => {
                w.put_u8(0xff);
                write_varint(*height, w);
            }
            Self::Key {
                amount,
                key_offsets,
                key_image,
            } => {
                w.put_u8(0x02);
                write_varint(*amount, w);
                write_varint(key_offsets.len() as u64, w);
                let mut previous = 0u64;
                for (i, offset) in key_offsets.iter().enumerate() {
                    let wire_value = if i == 0 { *offset } else { offset.wrapping_sub(previous) };
                    write_varint(wire_value, w);
                    previous = *offset;
                }
                key_image.encode(w);
            }
            Self::Multisig {
                amount,
                output_index,
                signer_key,
            } => {
                w.put_u8(0x03);
                write_varint(*amount, w);
                write_varint(*output_index, w);
                signer_key.encode(w);
            }
        }
    }
}

impl Decode for Input {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        require(r, 1)?;
        match r.get_u8() {
            0xff => Ok(Self::Coinbase {
                height: read_varint(r)?,
            }),
            0x02 => {
                let amount = read_varint(r)?;
                let len = read_len(r)?;
                let mut key_offsets = Vec::with_capacity(len.min(4096));
                let mut previous = 0u64;
                for i in 0..len {
                    let wire_value = read_varint(r)?;
                    let offset = if i == 0 { wire_value } else { previous.wrapping_add(wire_value) };
                    key_offsets.push(offset);
                    previous = offset;
                }
                let key_image = Hash::decode(r)?;
                Ok(Self::Key {
                    amount,
                    key_offsets,
                    key_image,
                })
            }
            0x03 => Ok(Self::Multisig {
                amount: read_varint(r)?,
                output_index: read_varint(r)?,
                signer_key: Hash::decode(r)?,
            }),
            other => Err(Error::UnknownMarker(other)),
        }
    }
}

impl Encode for OutputTarget {
    fn encode<B: BufMut>(&self, w: &mut B) {
        match self {
            Self::Key { key } => {
                w.put_u8(0x02);
                key.encode(w);
            }
            Self::Multisig {
                required_signatures,
                keys,
            } => {
                w.put_u8(0x03);
                w.put_u8(*required_signatures);
                keys.encode(w);
            }
        }
    }
}

impl Decode for OutputTarget {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        require(r, 1)?;
        match r.get_u8() {
            0x02 => Ok(Self::Key {
                key: Hash::decode(r)?,
            }),
            0x03 => {
                require(r, 1)?;
                let required_signatures = r.get_u8();
                let keys = Vec::<Hash>::decode(r)?;
                Ok(Self::Multisig {
                    required_signatures,
                    keys,
                })
            }
            other => Err(Error::UnknownMarker(other)),
        }
    }
}

impl Encode for Output {
    fn encode<B: BufMut>(&self, w: &mut B) {
        write_varint(self.amount, w);
        self.target.encode(w);
    }
}
impl Decode for Output {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        Ok(Self {
            amount: read_varint(r)?,
            target: OutputTarget::decode(r)?,
        })
    }
}

impl Encode for RingSignature {
    fn encode<B: BufMut>(&self, w: &mut B) {
        write_varint(self.members.len() as u64, w);
        for (c, r) in &self.members {
            c.encode(w);
            r.encode(w);
        }
    }
}
impl Decode for RingSignature {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        let len = read_len(r)?;
        let mut members = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            members.push((Hash::decode(r)?, Hash::decode(r)?));
        }
        Ok(Self { members })
    }
}

/// Parses a transaction's `extra` bytes into individual [`ExtraField`]s.
///
/// Unrecognised tags are skipped defensively rather than failing the whole
/// parse, matching the reference parser's tolerance of trailing garbage.
pub fn parse_extra_fields(mut extra: &[u8]) -> Vec<ExtraField> {
    let mut fields = Vec::new();
    while !extra.is_empty() {
        let tag = extra[0];
        extra = &extra[1..];
        match tag {
            0x00 => {
                let pad_len = extra.iter().take_while(|&&b| b == 0).count().max(1);
                fields.push(ExtraField::Padding(pad_len as u8));
                extra = &extra[pad_len.min(extra.len())..];
            }
            0x01 => {
                if extra.len() < 32 {
                    break;
                }
                let mut key = [0u8; 32];
                key.copy_from_slice(&extra[..32]);
                fields.push(ExtraField::PublicKey(Hash(key)));
                extra = &extra[32..];
            }
            0x02 => {
                let mut buf = extra;
                let Ok(len) = read_varint(&mut buf) else {
                    break;
                };
                let len = len as usize;
                if buf.len() < len {
                    break;
                }
                fields.push(ExtraField::Nonce(buf[..len].to_vec()));
                extra = &buf[len..];
            }
            _ => break,
        }
    }
    fields
}

impl Encode for Transaction {
    fn encode<B: BufMut>(&self, w: &mut B) {
        write_varint(self.version, w);
        write_varint(self.unlock_time, w);
        self.inputs.encode(w);
        self.outputs.encode(w);
        encode_bytes(&self.extra, w);
        self.signatures.encode(w);
    }
}
impl Decode for Transaction {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        Ok(Self {
            version: read_varint(r)?,
            unlock_time: read_varint(r)?,
            inputs: Vec::<Input>::decode(r)?,
            outputs: Vec::<Output>::decode(r)?,
            extra: decode_bytes(r)?,
            signatures: Vec::<RingSignature>::decode(r)?,
        })
    }
}

impl Encode for BlockHeader {
    fn encode<B: BufMut>(&self, w: &mut B) {
        w.put_u8(self.major_version);
        w.put_u8(self.minor_version);
        write_varint(self.timestamp, w);
        self.previous_block_hash.encode(w);
        w.put_u32_le(self.nonce);
    }
}
impl Decode for BlockHeader {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        require(r, 2)?;
        let major_version = r.get_u8();
        let minor_version = r.get_u8();
        let timestamp = read_varint(r)?;
        let previous_block_hash = Hash::decode(r)?;
        require(r, 4)?;
        let nonce = r.get_u32_le();
        Ok(Self {
            major_version,
            minor_version,
            timestamp,
            previous_block_hash,
            nonce,
        })
    }
}

impl Encode for Block {
    fn encode<B: BufMut>(&self, w: &mut B) {
        self.header.encode(w);
        self.miner_tx.encode(w);
        self.tx_hashes.encode(w);
    }
}
impl Decode for Block {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        Ok(Self {
            header: BlockHeader::decode(r)?,
            miner_tx: Transaction::decode(r)?,
            tx_hashes: Vec::<Hash>::decode(r)?,
        })
    }
}

impl Encode for BlockEntry {
    fn encode<B: BufMut>(&self, w: &mut B) {
        self.block.encode(w);
        self.id.encode(w);
        self.cumulative_difficulty.encode(w);
        write_varint(self.already_generated_coins, w);
        write_varint(self.block_size, w);
        write_varint(self.cumulative_size, w);
        self.transactions.encode(w);
        write_varint(self.output_indices.len() as u64, w);
        for indices in &self.output_indices {
            indices.encode(w);
        }
    }
}
impl Decode for BlockEntry {
    fn decode<B: Buf>(r: &mut B) -> Result<Self> {
        let block = Block::decode(r)?;
        let id = Hash::decode(r)?;
        let cumulative_difficulty = u128::decode(r)?;
        let already_generated_coins = read_varint(r)?;
        let block_size = read_varint(r)?;
        let cumulative_size = read_varint(r)?;
        let transactions = Vec::<Transaction>::decode(r)?;
        let output_indices_len = read_len(r)?;
        let mut output_indices = Vec::with_capacity(output_indices_len.min(4096));
        for _ in 0..output_indices_len {
            output_indices.push(Vec::<u64>::decode(r)?);
        }
        Ok(Self {
            block,
            id,
            cumulative_difficulty,
            already_generated_coins,
            block_size,
            cumulative_size,
            transactions,
            output_indices,
        })
    }
}

/// Encodes `value` into a freshly-allocated buffer.
pub fn to_vec<T: Encode>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}

/// Decodes a `T` from the front of `bytes`, requiring every byte to be
/// consumed.
pub fn from_slice<T: Decode>(mut bytes: &[u8]) -> Result<T> {
    let value = T::decode(&mut bytes)?;
    if bytes.is_empty() {
        Ok(value)
    } else {
        Err(Error::LengthTooLarge(bytes.len() as u64, 0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cryptonote_types::Output;

    #[test]
    fn hash_round_trips() {
        let h = Hash([9; 32]);
        let bytes = to_vec(&h);
        assert_eq!(bytes.len(), 32);
        let back: Hash = from_slice(&bytes).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn transaction_round_trips() {
        let tx = Transaction {
            version: 2,
            unlock_time: 0,
            inputs: vec![Input::Key {
                amount: 0,
                key_offsets: vec![1, 2, 3],
                key_image: Hash([1; 32]),
            }],
            outputs: vec![Output {
                amount: 500,
                target: OutputTarget::Key { key: Hash([2; 32]) },
            }],
            extra: vec![0x01; 33],
            signatures: vec![RingSignature {
                members: vec![(Hash([3; 32]), Hash([4; 32]))],
            }],
        };
        let bytes = to_vec(&tx);
        let back: Transaction = from_slice(&bytes).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn key_offsets_are_delta_encoded_on_the_wire() {
        let input = Input::Key {
            amount: 0,
            key_offsets: vec![5, 9, 40, 41],
            key_image: Hash([1; 32]),
        };
        let bytes = to_vec(&input);
        let back: Input = from_slice(&bytes).unwrap();
        assert_eq!(input, back);

        // First entry absolute (5), then deltas 4, 31, 1 - not the absolute
        // values themselves - confirming the wire form is relative.
        let mut buf = &bytes[2..]; // skip tag byte and amount varint
        assert_eq!(read_varint(&mut buf).unwrap(), 4); // len
        assert_eq!(read_varint(&mut buf).unwrap(), 5);
        assert_eq!(read_varint(&mut buf).unwrap(), 4);
        assert_eq!(read_varint(&mut buf).unwrap(), 31);
        assert_eq!(read_varint(&mut buf).unwrap(), 1);
    }
}
