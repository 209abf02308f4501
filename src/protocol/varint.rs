//! Integer and field primitives
//!
//! Fixed-width little-endian integers, base-128 varints and
//! length-prefixed byte fields.

use bytes::{BufMut, Bytes};

use crate::error::{Result, TntError};

/// Longest varint accepted by the decoder
pub const MAX_VARINT_LEN: usize = 5;

// =============================================================================
// Fixed Integers
// =============================================================================

/// Pack a u32 as a 4-byte little-endian field
pub fn pack_u32(value: u32) -> Bytes {
    Bytes::copy_from_slice(&value.to_le_bytes())
}

/// Pack a u64 as an 8-byte little-endian field
pub fn pack_u64(value: u64) -> Bytes {
    Bytes::copy_from_slice(&value.to_le_bytes())
}

/// Read a 4-byte little-endian field
pub fn unpack_u32(field: &[u8]) -> Result<u32> {
    let raw: [u8; 4] = field.try_into().map_err(|_| {
        TntError::Decode(format!("expected 4-byte integer field, got {} bytes", field.len()))
    })?;
    Ok(u32::from_le_bytes(raw))
}

/// Read an 8-byte little-endian field
pub fn unpack_u64(field: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = field.try_into().map_err(|_| {
        TntError::Decode(format!("expected 8-byte integer field, got {} bytes", field.len()))
    })?;
    Ok(u64::from_le_bytes(raw))
}

// =============================================================================
// Base-128 Varint
// =============================================================================

/// Number of bytes `value` occupies as a varint
pub fn varint_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Append `value` as a varint, most significant group first
pub fn put_varint<B: BufMut>(buf: &mut B, value: u32) {
    let len = varint_len(value);
    for group in (1..len).rev() {
        buf.put_u8(((value >> (7 * group)) & 0x7F) as u8 | 0x80);
    }
    buf.put_u8((value & 0x7F) as u8);
}

/// Encode `value` as a standalone varint
pub fn encode_varint(value: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(varint_len(value));
    put_varint(&mut buf, value);
    buf
}

/// Decode a varint from the start of `bytes`
///
/// Returns the value and the number of bytes consumed.
pub fn decode_varint(bytes: &[u8]) -> Result<(u32, usize)> {
    let mut value: u64 = 0;

    for (i, &byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            let value = u32::try_from(value)
                .map_err(|_| TntError::Decode(format!("varint overflows u32: {}", value)))?;
            return Ok((value, i + 1));
        }
    }

    if bytes.len() >= MAX_VARINT_LEN {
        Err(TntError::Decode(format!(
            "varint longer than {} bytes",
            MAX_VARINT_LEN
        )))
    } else {
        Err(TntError::Decode("truncated varint".to_string()))
    }
}

// =============================================================================
// Fields
// =============================================================================

/// Encoded size of a length-prefixed field
pub fn field_len(field: &[u8]) -> Result<usize> {
    let len = checked_len(field)?;
    Ok(varint_len(len) + field.len())
}

/// Append a length-prefixed field
///
/// The length must already have been validated by [`field_len`].
pub fn put_field<B: BufMut>(buf: &mut B, field: &[u8]) {
    put_varint(buf, field.len() as u32);
    buf.put_slice(field);
}

/// Decode a length-prefixed field from the start of `bytes`
///
/// The returned field shares memory with `bytes`. Also returns the number of
/// bytes consumed.
pub fn decode_field(bytes: &Bytes) -> Result<(Bytes, usize)> {
    let (len, prefix) = decode_varint(bytes)?;
    let end = prefix + len as usize;
    if end > bytes.len() {
        return Err(TntError::Decode(format!(
            "field of {} bytes runs past the end of the buffer ({} bytes left)",
            len,
            bytes.len() - prefix
        )));
    }
    Ok((bytes.slice(prefix..end), end))
}

fn checked_len(field: &[u8]) -> Result<u32> {
    u32::try_from(field.len())
        .map_err(|_| TntError::Encode(format!("field of {} bytes is too long", field.len())))
}
