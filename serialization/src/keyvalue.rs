//! The key-value binary ("portable storage") codec used for RPC envelopes:
//! tagged `(name, type, value)` tuples behind a fixed 9-byte header.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};
use crate::varint::{read_varint, write_varint};

/// The fixed header every portable-storage blob starts with.
pub const HEADER: [u8; 9] = [0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01];

/// The maximum number of fields accepted in a single object, guarding
/// against a corrupt/hostile field count.
const MAX_FIELDS: u64 = 1_000;

/// Per-value type marker, matching the reference `{byte:0, word:1,
/// dword:2, qword:3}` family plus string/bool/object/array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Marker {
    /// `i64`
    I64 = 1,
    /// `i32`
    I32 = 2,
    /// `i16`
    I16 = 3,
    /// `i8`
    I8 = 4,
    /// `u64` ("qword")
    U64 = 5,
    /// `u32` ("dword")
    U32 = 6,
    /// `u16` ("word")
    U16 = 7,
    /// `u8` ("byte")
    U8 = 8,
    /// `f64`
    F64 = 9,
    /// Length-prefixed byte string.
    String = 10,
    /// `bool`
    Bool = 11,
    /// A nested object (section).
    Object = 12,
}

const ARRAY_FLAG: u8 = 0x80;

impl Marker {
    fn from_u8(byte: u8) -> Result<(Self, bool)> {
        let is_array = byte & ARRAY_FLAG != 0;
        let plain = byte & !ARRAY_FLAG;
        let marker = match plain {
            1 => Self::I64,
            2 => Self::I32,
            3 => Self::I16,
            4 => Self::I8,
            5 => Self::U64,
            6 => Self::U32,
            7 => Self::U16,
            8 => Self::U8,
            9 => Self::F64,
            10 => Self::String,
            11 => Self::Bool,
            12 => Self::Object,
            _ => return Err(Error::UnknownMarker(byte)),
        };
        Ok((marker, is_array))
    }
}

/// A decoded (or to-be-encoded) portable-storage value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed/unsigned fixed-width integers, named after their marker.
    I64(i64),
    I32(i32),
    I16(i16),
    I8(i8),
    U64(u64),
    U32(u32),
    U16(u16),
    U8(u8),
    /// IEEE-754 double.
    F64(f64),
    /// A length-prefixed byte string (used for both text and raw blobs).
    String(Vec<u8>),
    /// A boolean.
    Bool(bool),
    /// A nested section.
    Object(BTreeMap<String, Value>),
    /// A homogeneous array of any of the above, including nested arrays of
    /// objects (sections).
    Array(Vec<Value>),
}

fn write_string<B: BufMut>(bytes: &[u8], w: &mut B) {
    write_varint(bytes.len() as u64, w);
    w.put_slice(bytes);
}

fn read_string<B: Buf>(r: &mut B) -> Result<Vec<u8>> {
    let len = read_varint(r)? as usize;
    if r.remaining() < len {
        return Err(Error::UnexpectedEof);
    }
    let mut out = vec![0u8; len];
    r.copy_to_slice(&mut out);
    Ok(out)
}

fn write_scalar<B: BufMut>(value: &Value, w: &mut B) -> Result<()> {
    match value {
        Value::I64(v) => w.put_i64_le(*v),
        Value::I32(v) => w.put_i32_le(*v),
        Value::I16(v) => w.put_i16_le(*v),
        Value::I8(v) => w.put_i8(*v),
        Value::U64(v) => w.put_u64_le(*v),
        Value::U32(v) => w.put_u32_le(*v),
        Value::U16(v) => w.put_u16_le(*v),
        Value::U8(v) => w.put_u8(*v),
        Value::F64(v) => w.put_f64_le(*v),
        Value::String(bytes) => write_string(bytes, w),
        Value::Bool(v) => w.put_u8(u8::from(*v)),
        Value::Object(obj) => write_object(obj, w)?,
        Value::Array(_) => unreachable!("arrays are written by `write_value`"),
    }
    Ok(())
}

fn marker_of(value: &Value) -> Marker {
    match value {
        Value::I64(_) => Marker::I64,
        Value::I32(_) => Marker::I32,
        Value::I16(_) => Marker::I16,
        Value::I8(_) => Marker::I8,
        Value::U64(_) => Marker::U64,
        Value::U32(_) => Marker::U32,
        Value::U16(_) => Marker::U16,
        Value::U8(_) => Marker::U8,
        Value::F64(_) => Marker::F64,
        Value::String(_) => Marker::String,
        Value::Bool(_) => Marker::Bool,
        Value::Object(_) => Marker::Object,
        Value::Array(items) => items.first().map_or(Marker::U8, marker_of),
    }
}

/// Writes a full `(marker-byte, value)` pair, as found after a field name.
pub fn write_value<B: BufMut>(value: &Value, w: &mut B) -> Result<()> {
    match value {
        Value::Array(items) => {
            let marker = items.first().map_or(Marker::U8, marker_of);
            w.put_u8(marker as u8 | ARRAY_FLAG);
            write_varint(items.len() as u64, w);
            for item in items {
                write_scalar(item, w)?;
            }
            Ok(())
        }
        other => {
            w.put_u8(marker_of(other) as u8);
            write_scalar(other, w)
        }
    }
}

fn write_object<B: BufMut>(obj: &BTreeMap<String, Value>, w: &mut B) -> Result<()> {
    write_varint(obj.len() as u64, w);
    for (name, value) in obj {
        write_string(name.as_bytes(), w);
        write_value(value, w)?;
    }
    Ok(())
}

fn read_scalar<B: Buf>(marker: Marker, r: &mut B) -> Result<Value> {
    Ok(match marker {
        Marker::I64 => {
            if r.remaining() < 8 {
                return Err(Error::UnexpectedEof);
            }
            Value::I64(r.get_i64_le())
        }
        Marker::I32 => {
            if r.remaining() < 4 {
                return Err(Error::UnexpectedEof);
            }
            Value::I32(r.get_i32_le())
        }
        Marker::I16 => {
            if r.remaining() < 2 {
                return Err(Error::UnexpectedEof);
            }
            Value::I16(r.get_i16_le())
        }
        Marker::I8 => {
            if r.remaining() < 1 {
                return Err(Error::UnexpectedEof);
            }
            Value::I8(r.get_i8())
        }
        Marker::U64 => {
            if r.remaining() < 8 {
                return Err(Error::UnexpectedEof);
            }
            Value::U64(r.get_u64_le())
        }
        Marker::U32 => {
            if r.remaining() < 4 {
                return Err(Error::UnexpectedEof);
            }
            Value::U32(r.get_u32_le())
        }
        Marker::U16 => {
            if r.remaining() < 2 {
                return Err(Error::UnexpectedEof);
            }
            Value::U16(r.get_u16_le())
        }
        Marker::U8 => {
            if r.remaining() < 1 {
                return Err(Error::UnexpectedEof);
            }
            Value::U8(r.get_u8())
        }
        Marker::F64 => {
            if r.remaining() < 8 {
                return Err(Error::UnexpectedEof);
            }
            Value::F64(r.get_f64_le())
        }
        Marker::String => Value::String(read_string(r)?),
        Marker::Bool => {
            if r.remaining() < 1 {
                return Err(Error::UnexpectedEof);
            }
            Value::Bool(r.get_u8() != 0)
        }
        Marker::Object => Value::Object(read_object(r)?),
    })
}

/// Reads a full `(marker-byte, value)` pair.
pub fn read_value<B: Buf>(r: &mut B) -> Result<Value> {
    if !r.has_remaining() {
        return Err(Error::UnexpectedEof);
    }
    let (marker, is_array) = Marker::from_u8(r.get_u8())?;
    if is_array {
        let len = read_varint(r)?;
        if len > MAX_FIELDS * 64 {
            return Err(Error::LengthTooLarge(len, MAX_FIELDS * 64));
        }
        let mut items = Vec::with_capacity(len.min(4096) as usize);
        for _ in 0..len {
            items.push(read_scalar(marker, r)?);
        }
        Ok(Value::Array(items))
    } else {
        read_scalar(marker, r)
    }
}

fn read_object<B: Buf>(r: &mut B) -> Result<BTreeMap<String, Value>> {
    let count = read_varint(r)?;
    if count > MAX_FIELDS {
        return Err(Error::LengthTooLarge(count, MAX_FIELDS));
    }
    let mut map = BTreeMap::new();
    for _ in 0..count {
        let name_bytes = read_string(r)?;
        let name = String::from_utf8(name_bytes).map_err(|_| Error::InvalidUtf8)?;
        map.insert(name, read_value(r)?);
    }
    Ok(map)
}

/// Encodes a full envelope: header followed by a top-level object.
pub fn to_vec(obj: &BTreeMap<String, Value>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&HEADER);
    write_object(obj, &mut buf)?;
    Ok(buf)
}

/// Decodes a full envelope: header followed by a top-level object.
pub fn from_slice(mut bytes: &[u8]) -> Result<BTreeMap<String, Value>> {
    if bytes.len() < HEADER.len() || bytes[..HEADER.len()] != HEADER {
        return Err(Error::BadHeader);
    }
    bytes = &bytes[HEADER.len()..];
    read_object(&mut bytes)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_a_small_envelope() {
        let mut obj = BTreeMap::new();
        obj.insert("height".to_owned(), Value::U64(123));
        obj.insert(
            "ids".to_owned(),
            Value::Array(vec![Value::U32(1), Value::U32(2), Value::U32(3)]),
        );

        let bytes = to_vec(&obj).unwrap();
        assert_eq!(&bytes[..HEADER.len()], &HEADER);

        let decoded = from_slice(&bytes).unwrap();
        assert_eq!(decoded, obj);
    }

    #[test]
    fn rejects_bad_header() {
        let err = from_slice(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, Error::BadHeader));
    }
}
