//! Protocol Module
//!
//! Binary IPROTO wire format, little-endian throughout.
//!
//! ### Frame Format
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────┐
//! │ Type (4) │ Len (4)  │  ID (4)  │        Body         │
//! └──────────┴──────────┴──────────┴─────────────────────┘
//! ```
//!
//! ### Request Types
//! - 13: INSERT - space, flags, tuple
//! - 17: SELECT - space, index, offset, limit, count, key tuples
//! - 19: UPDATE - space, flags, key tuple, operators
//! - 21: DELETE - space, flags, key tuple
//! - 22: CALL   - flags, procedure name, argument tuple
//!
//! ### Field / Tuple
//! ```text
//! field: varint(len) + bytes
//! tuple: count (4) + field * count
//! ```

mod varint;
mod tuple;
mod request;
mod response;
mod codec;

pub use varint::{
    decode_field, decode_varint, encode_varint, field_len, pack_u32, pack_u64, put_field,
    put_varint, unpack_u32, unpack_u64, varint_len, MAX_VARINT_LEN,
};
pub use tuple::{decode_tuple, encode_tuple, put_tuple, tuple_len, Field, Tuple};
pub use request::{
    Call, Delete, Insert, Keys, OpCode, Operator, Request, RequestType, Select, Space, Update,
};
pub use response::Response;
pub use codec::{read_frame, write_frame, Header, HEADER_SIZE, MAX_BODY_SIZE};
