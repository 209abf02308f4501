//! Request definitions and packing
//!
//! Every request kind computes its exact body size first, so packing
//! allocates once and never grows the buffer.

use bytes::{BufMut, Bytes, BytesMut};

use super::codec::{Header, HEADER_SIZE};
use super::tuple::{put_tuple, tuple_len, Field, Tuple};
use super::varint::{field_len, pack_u32, put_field};
use crate::error::{Result, TntError};

/// Request type codes carried in the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RequestType {
    Insert = 13,
    Select = 17,
    Update = 19,
    Delete = 21,
    Call = 22,
}

// =============================================================================
// Space Identifiers
// =============================================================================

/// Target space of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Space {
    /// Numeric space id
    Id(u32),

    /// Space given as text; only the decimal form of a u32 is supported
    Name(String),
}

impl Space {
    /// Numeric id to put on the wire
    pub fn resolve(&self) -> Result<u32> {
        match self {
            Space::Id(id) => Ok(*id),
            Space::Name(name) => name.trim().parse::<u32>().map_err(|_| {
                TntError::Encode(format!("unsupported space identifier {:?}", name))
            }),
        }
    }
}

impl From<u32> for Space {
    fn from(id: u32) -> Self {
        Space::Id(id)
    }
}

impl From<&str> for Space {
    fn from(name: &str) -> Self {
        Space::Name(name.to_string())
    }
}

impl From<String> for Space {
    fn from(name: String) -> Self {
        Space::Name(name)
    }
}

fn effective_space(space: &Option<Space>, default_space: u32) -> Result<u32> {
    match space {
        Some(space) => space.resolve(),
        None => Ok(default_space),
    }
}

// =============================================================================
// Request Kinds
// =============================================================================

/// Keys of a select; the variants are mutually exclusive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Keys {
    /// No keys: the server sees an empty key list
    #[default]
    None,

    /// One record by a single-field key
    Value(Field),

    /// Several records by single-field keys
    Values(Vec<Field>),

    /// Several records by composite keys
    Tuples(Vec<Tuple>),
}

/// Look up records by index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    pub space: Option<Space>,
    pub index: u32,
    pub offset: u32,
    /// 0 means unbounded
    pub limit: u32,
    pub keys: Keys,
}

impl Select {
    /// Select a single record by key from the default space
    pub fn by_value(value: impl Into<Field>) -> Self {
        Self {
            keys: Keys::Value(value.into()),
            ..Self::default()
        }
    }
}

/// Store a tuple
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Insert {
    pub space: Option<Space>,
    pub tuple: Tuple,
    pub return_tuple: bool,
}

impl Insert {
    pub fn new(tuple: Tuple) -> Self {
        Self {
            tuple,
            ..Self::default()
        }
    }
}

/// Update operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Set = 0,
    Add = 1,
    And = 2,
    Xor = 3,
    Or = 4,
    Splice = 5,
    Delete = 6,
    Insert = 7,
}

/// One field update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub field: u32,
    pub opcode: OpCode,
    pub operand: Field,
}

impl Operator {
    pub fn new(field: u32, opcode: OpCode, operand: impl Into<Field>) -> Self {
        Self {
            field,
            opcode,
            operand: operand.into(),
        }
    }

    pub fn set(field: u32, value: impl Into<Field>) -> Self {
        Self::new(field, OpCode::Set, value)
    }

    /// Arithmetic operators take a 4 or 8 byte integer operand
    pub fn add(field: u32, value: impl Into<Field>) -> Self {
        Self::new(field, OpCode::Add, value)
    }

    pub fn and(field: u32, value: impl Into<Field>) -> Self {
        Self::new(field, OpCode::And, value)
    }

    pub fn xor(field: u32, value: impl Into<Field>) -> Self {
        Self::new(field, OpCode::Xor, value)
    }

    pub fn or(field: u32, value: impl Into<Field>) -> Self {
        Self::new(field, OpCode::Or, value)
    }

    /// Replace `length` bytes at `offset` with `data`
    ///
    /// The operand is itself three length-prefixed fields.
    pub fn splice(field: u32, offset: u32, length: u32, data: &[u8]) -> Result<Self> {
        let offset = pack_u32(offset);
        let length = pack_u32(length);
        let size = field_len(&offset)? + field_len(&length)? + field_len(data)?;

        let mut operand = BytesMut::with_capacity(size);
        put_field(&mut operand, &offset);
        put_field(&mut operand, &length);
        put_field(&mut operand, data);

        Ok(Self::new(field, OpCode::Splice, operand.freeze()))
    }

    /// Remove the field from the tuple
    pub fn delete(field: u32) -> Self {
        Self::new(field, OpCode::Delete, Bytes::new())
    }

    /// Insert a new field before `field`
    pub fn insert(field: u32, value: impl Into<Field>) -> Self {
        Self::new(field, OpCode::Insert, value)
    }

    fn encoded_len(&self) -> Result<usize> {
        Ok(4 + 1 + field_len(&self.operand)?)
    }
}

/// Modify a record found by primary key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Update {
    pub space: Option<Space>,
    pub key: Tuple,
    pub ops: Vec<Operator>,
    pub return_tuple: bool,
}

/// Remove a record by primary key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delete {
    pub space: Option<Space>,
    pub key: Tuple,
    pub return_tuple: bool,
}

impl Delete {
    /// Delete by a single-field key
    pub fn by_value(value: impl Into<Field>) -> Self {
        Self {
            key: vec![value.into()],
            ..Self::default()
        }
    }
}

/// Invoke a stored procedure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Call {
    pub name: String,
    pub args: Tuple,
    pub return_tuple: bool,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Tuple) -> Self {
        Self {
            name: name.into(),
            args,
            return_tuple: false,
        }
    }
}

// =============================================================================
// Request
// =============================================================================

/// Any request the client can send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Call(Call),
}

impl From<Select> for Request {
    fn from(request: Select) -> Self {
        Request::Select(request)
    }
}

impl From<Insert> for Request {
    fn from(request: Insert) -> Self {
        Request::Insert(request)
    }
}

impl From<Update> for Request {
    fn from(request: Update) -> Self {
        Request::Update(request)
    }
}

impl From<Delete> for Request {
    fn from(request: Delete) -> Self {
        Request::Delete(request)
    }
}

impl From<Call> for Request {
    fn from(request: Call) -> Self {
        Request::Call(request)
    }
}

impl Request {
    /// Get the request type
    pub fn request_type(&self) -> RequestType {
        match self {
            Request::Select(_) => RequestType::Select,
            Request::Insert(_) => RequestType::Insert,
            Request::Update(_) => RequestType::Update,
            Request::Delete(_) => RequestType::Delete,
            Request::Call(_) => RequestType::Call,
        }
    }

    /// Exact size of the body that [`Request::pack`] produces
    pub fn body_len(&self) -> Result<usize> {
        let len = match self {
            Request::Select(select) => {
                let keys = match &select.keys {
                    Keys::None => 0,
                    Keys::Value(value) => 4 + field_len(value)?,
                    Keys::Values(values) => {
                        check_count(values.len(), "select keys")?;
                        values
                            .iter()
                            .try_fold(0, |acc, value| Ok::<_, TntError>(acc + 4 + field_len(value)?))?
                    }
                    Keys::Tuples(tuples) => {
                        check_count(tuples.len(), "select keys")?;
                        tuples
                            .iter()
                            .try_fold(0, |acc, tuple| Ok::<_, TntError>(acc + tuple_len(tuple)?))?
                    }
                };
                20 + keys
            }
            Request::Insert(insert) => 8 + tuple_len(&insert.tuple)?,
            Request::Update(update) => {
                check_count(update.ops.len(), "update operators")?;
                let ops = update
                    .ops
                    .iter()
                    .try_fold(0, |acc, op| Ok::<_, TntError>(acc + op.encoded_len()?))?;
                8 + tuple_len(&update.key)? + 4 + ops
            }
            Request::Delete(delete) => 8 + tuple_len(&delete.key)?,
            Request::Call(call) => 4 + field_len(call.name.as_bytes())? + tuple_len(&call.args)?,
        };
        Ok(len)
    }

    /// Encode header and body
    ///
    /// Requests without an explicit space go to `default_space`.
    pub fn pack(&self, request_id: u32, default_space: u32) -> Result<Bytes> {
        let body_len = self.body_len()?;
        let header = Header {
            request_type: self.request_type() as u32,
            body_len: u32::try_from(body_len)
                .map_err(|_| TntError::Encode(format!("request body of {} bytes is too long", body_len)))?,
            request_id,
        };

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + body_len);
        header.put(&mut buf);

        match self {
            Request::Select(select) => {
                buf.put_u32_le(effective_space(&select.space, default_space)?);
                buf.put_u32_le(select.index);
                buf.put_u32_le(select.offset);
                buf.put_u32_le(if select.limit == 0 { u32::MAX } else { select.limit });

                match &select.keys {
                    Keys::None => buf.put_u32_le(0),
                    Keys::Value(value) => {
                        buf.put_u32_le(1);
                        put_tuple(&mut buf, std::slice::from_ref(value));
                    }
                    Keys::Values(values) => {
                        buf.put_u32_le(values.len() as u32);
                        for value in values {
                            put_tuple(&mut buf, std::slice::from_ref(value));
                        }
                    }
                    Keys::Tuples(tuples) => {
                        buf.put_u32_le(tuples.len() as u32);
                        for tuple in tuples {
                            put_tuple(&mut buf, tuple);
                        }
                    }
                }
            }
            Request::Insert(insert) => {
                buf.put_u32_le(effective_space(&insert.space, default_space)?);
                buf.put_u32_le(insert.return_tuple as u32);
                put_tuple(&mut buf, &insert.tuple);
            }
            Request::Update(update) => {
                buf.put_u32_le(effective_space(&update.space, default_space)?);
                buf.put_u32_le(update.return_tuple as u32);
                put_tuple(&mut buf, &update.key);
                buf.put_u32_le(update.ops.len() as u32);
                for op in &update.ops {
                    buf.put_u32_le(op.field);
                    buf.put_u8(op.opcode as u8);
                    put_field(&mut buf, &op.operand);
                }
            }
            Request::Delete(delete) => {
                buf.put_u32_le(effective_space(&delete.space, default_space)?);
                buf.put_u32_le(delete.return_tuple as u32);
                put_tuple(&mut buf, &delete.key);
            }
            Request::Call(call) => {
                buf.put_u32_le(call.return_tuple as u32);
                put_field(&mut buf, call.name.as_bytes());
                put_tuple(&mut buf, &call.args);
            }
        }

        debug_assert_eq!(buf.len(), HEADER_SIZE + body_len);
        Ok(buf.freeze())
    }
}

fn check_count(count: usize, what: &str) -> Result<()> {
    if u32::try_from(count).is_err() {
        return Err(TntError::Encode(format!("too many {}: {}", what, count)));
    }
    Ok(())
}
