//! Memcached-style access to a tuple space
//!
//! Values live in `Options::memcache_space` as tuples of
//! `[key, meta, suffix, value]` where `meta` is
//! `expires (4) + flags (4) + cas (8)` and `suffix` is the
//! `" <flags> <bytes>\r\n"` text of a memcached reply line.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TntError};
use crate::network::Connection;
use crate::protocol::{Delete, Insert, Select, Space};

/// Field positions of a memcache tuple
const VALUE_FIELD: usize = 3;
const META_SIZE: usize = 16;

/// get/set/delete over a shared connection
///
/// Holds the CAS counter stamped into every stored tuple.
pub struct Memcache {
    conn: Arc<Connection>,
    cas: AtomicU64,
}

impl Memcache {
    pub fn new(conn: impl Into<Arc<Connection>>) -> Self {
        Self {
            conn: conn.into(),
            cas: AtomicU64::new(0),
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    fn space(&self) -> Option<Space> {
        Some(self.conn.options().memcache_space.into())
    }

    /// Fetch the value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let tuples = self.conn.execute(Select {
            space: self.space(),
            ..Select::by_value(Bytes::copy_from_slice(key.as_bytes()))
        })?;

        match tuples.into_iter().next() {
            None => Ok(None),
            Some(tuple) => tuple.into_iter().nth(VALUE_FIELD).map(Some).ok_or_else(|| {
                TntError::Decode(format!("memcache tuple for {:?} has no value field", key))
            }),
        }
    }

    /// Store `value` under `key`, replacing any previous value
    ///
    /// `expires` is a unix timestamp; 0 means never.
    pub fn set(&self, key: &str, value: &[u8], expires: u32) -> Result<()> {
        let flags = 0u32;
        let cas = self.cas.fetch_add(1, Ordering::Relaxed) + 1;

        let mut meta = BytesMut::with_capacity(META_SIZE);
        meta.put_u32_le(expires);
        meta.put_u32_le(flags);
        meta.put_u64_le(cas);

        let suffix = format!(" {} {}\r\n", flags, value.len());

        self.conn.execute(Insert {
            space: self.space(),
            tuple: vec![
                Bytes::copy_from_slice(key.as_bytes()),
                meta.freeze(),
                Bytes::from(suffix),
                Bytes::copy_from_slice(value),
            ],
            return_tuple: false,
        })?;
        Ok(())
    }

    /// Remove `key`
    pub fn delete(&self, key: &str) -> Result<()> {
        self.conn.execute(Delete {
            space: self.space(),
            ..Delete::by_value(Bytes::copy_from_slice(key.as_bytes()))
        })?;
        Ok(())
    }
}
