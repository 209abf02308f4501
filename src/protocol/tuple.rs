//! Tuple codec
//!
//! A tuple is a u32 field count followed by each field, length-prefixed.

use bytes::{BufMut, Bytes, BytesMut};

use super::varint::{decode_field, field_len, put_field};
use crate::error::{Result, TntError};

/// Opaque unit of tuple data
pub type Field = Bytes;

/// Ordered sequence of fields
pub type Tuple = Vec<Field>;

/// Encoded size of a tuple: count word plus every field
pub fn tuple_len(tuple: &[Field]) -> Result<usize> {
    check_count(tuple.len())?;
    tuple
        .iter()
        .try_fold(4, |acc, field| Ok(acc + field_len(field)?))
}

/// Append a tuple whose size was validated by [`tuple_len`]
pub fn put_tuple<B: BufMut>(buf: &mut B, tuple: &[Field]) {
    buf.put_u32_le(tuple.len() as u32);
    for field in tuple {
        put_field(buf, field);
    }
}

/// Encode a tuple into a fresh buffer
pub fn encode_tuple(tuple: &[Field]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(tuple_len(tuple)?);
    put_tuple(&mut buf, tuple);
    Ok(buf.freeze())
}

/// Decode a tuple occupying `bytes`
///
/// Fields are zero-copy slices of `bytes`. Trailing bytes after the last
/// field are ignored.
pub fn decode_tuple(bytes: &Bytes) -> Result<Tuple> {
    if bytes.len() < 4 {
        return Err(TntError::Decode(format!(
            "tuple too short for field count: {} bytes",
            bytes.len()
        )));
    }

    let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;

    // Every field takes at least one byte, so a larger count can't be honest
    let mut offset = 4;
    if count > bytes.len() - offset {
        return Err(TntError::Decode(format!(
            "tuple claims {} fields in {} bytes",
            count,
            bytes.len() - offset
        )));
    }

    let mut tuple = Vec::with_capacity(count);
    for _ in 0..count {
        let (field, consumed) = decode_field(&bytes.slice(offset..))?;
        tuple.push(field);
        offset += consumed;
    }

    Ok(tuple)
}

fn check_count(count: usize) -> Result<()> {
    if u32::try_from(count).is_err() {
        return Err(TntError::Encode(format!("tuple of {} fields is too long", count)));
    }
    Ok(())
}
