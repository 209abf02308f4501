//! Frame codec
//!
//! Header encoding and blocking stream helpers.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────┐
//! │ Type (4) │ Len (4)  │  ID (4)  │   Body (Len bytes)  │
//! └──────────┴──────────┴──────────┴─────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{BufMut, Bytes};

use crate::error::{Result, TntError};

/// Header size: type + body length + request id
pub const HEADER_SIZE: usize = 12;

/// Largest response body the reader accepts (64 MB)
pub const MAX_BODY_SIZE: u32 = 64 * 1024 * 1024;

/// Fixed 12-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub request_type: u32,
    pub body_len: u32,
    pub request_id: u32,
}

impl Header {
    /// Append the header in wire order
    pub fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.request_type);
        buf.put_u32_le(self.body_len);
        buf.put_u32_le(self.request_id);
    }

    /// Decode a header from exactly [`HEADER_SIZE`] bytes
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            request_type: word(0),
            body_len: word(4),
            request_id: word(8),
        }
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame from a stream
///
/// Blocks until the header and the whole body have arrived or an error
/// occurs.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<(Header, Bytes)> {
    let mut raw = [0u8; HEADER_SIZE];
    reader.read_exact(&mut raw)?;
    let header = Header::decode(&raw);

    if header.body_len > MAX_BODY_SIZE {
        return Err(TntError::Decode(format!(
            "Body too large: {} bytes (max {})",
            header.body_len, MAX_BODY_SIZE
        )));
    }

    let mut body = vec![0u8; header.body_len as usize];
    if !body.is_empty() {
        reader.read_exact(&mut body)?;
    }

    Ok((header, Bytes::from(body)))
}

/// Write a packed frame without flushing
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    Ok(())
}
