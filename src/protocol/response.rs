//! Response decoding
//!
//! ## Body Format
//! ```text
//! ┌────────────┬──────────────┬──────────────────────────────────┐
//! │ Status (4) │ RowCount (4) │ Rows: Size (4) + Tuple (Size+4)  │
//! └────────────┴──────────────┴──────────────────────────────────┘
//! ```
//!
//! `status / 256` is the return code. A non-zero code is followed by a
//! NUL-terminated error message instead of rows.

use bytes::Bytes;

use super::tuple::{decode_tuple, Tuple};
use crate::error::{Result, TntError};

/// A decoded response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Request succeeded; zero or more tuples
    Tuples(Vec<Tuple>),

    /// Server rejected the request
    Error { code: u32, message: String },
}

impl Response {
    /// Decode a body (the bytes after the 12-byte header)
    ///
    /// When the body holds fewer complete rows than the row count claims,
    /// the rows present are returned. A row that runs past the body is an
    /// error.
    pub fn decode(body: &Bytes) -> Result<Self> {
        if body.len() < 4 {
            return Err(TntError::Decode(format!(
                "response body too short for status: {} bytes",
                body.len()
            )));
        }

        let code = read_u32(body, 0) / 0x100;

        if code != 0 {
            let mut message = &body[4..];
            if let [rest @ .., 0] = message {
                message = rest;
            }
            return Ok(Response::Error {
                code,
                message: String::from_utf8_lossy(message).into_owned(),
            });
        }

        if body.len() < 8 {
            return Ok(Response::Tuples(Vec::new()));
        }

        let row_count = read_u32(body, 4) as usize;
        let mut rows = Vec::with_capacity(row_count.min(body.len() / 8));
        let mut offset = 8;

        while rows.len() < row_count && offset < body.len() {
            if body.len() - offset < 4 {
                return Err(TntError::Decode(format!(
                    "truncated row header at offset {}",
                    offset
                )));
            }

            let size = read_u32(body, offset) as usize + 4;
            let start = offset + 4;
            let end = start
                .checked_add(size)
                .filter(|&end| end <= body.len())
                .ok_or_else(|| {
                    TntError::Decode(format!(
                        "row of {} bytes at offset {} runs past the body ({} bytes)",
                        size,
                        offset,
                        body.len()
                    ))
                })?;

            rows.push(decode_tuple(&body.slice(start..end))?);
            offset = end;
        }

        Ok(Response::Tuples(rows))
    }

    /// Turn the response into the tuples or the server error
    pub fn into_result(self) -> Result<Vec<Tuple>> {
        match self {
            Response::Tuples(tuples) => Ok(tuples),
            Response::Error { code, message } => Err(TntError::Server { code, message }),
        }
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
