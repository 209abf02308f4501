//! Pending-request table
//!
//! Maps request IDs to the callers waiting for them.
//!
//! ## Ownership
//! An entry is resolved by whoever removes it from the table: the reader
//! (response arrived), the caller (send deadline expired), a newer request
//! with the same ID (eviction), or the shutdown drain. Removal happens under
//! the lock and `resolve` consumes the entry, so each completion slot is
//! written at most once.

use std::collections::HashMap;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::Result;
use crate::protocol::Response;

/// Outcome delivered to a waiting caller
pub type Reply = Result<Response>;

/// An in-flight request
#[derive(Debug)]
pub struct PendingRequest {
    id: u32,
    raw: Bytes,
    reply: Sender<Reply>,
}

impl PendingRequest {
    /// Create an entry and the receiving half of its completion slot
    pub fn new(id: u32, raw: Bytes) -> (Self, Receiver<Reply>) {
        let (reply, receiver) = channel::bounded(1);
        (Self { id, raw, reply }, receiver)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Packed request bytes
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Complete the request. A caller that already gave up is ignored.
    pub fn resolve(self, reply: Reply) {
        let _ = self.reply.try_send(reply);
    }
}

/// Concurrency-safe table of in-flight requests
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: Mutex<HashMap<u32, PendingRequest>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pending` under its ID
    ///
    /// Returns the older entry that held the same ID, which the caller must
    /// resolve.
    pub fn put(&self, pending: PendingRequest) -> Option<PendingRequest> {
        self.entries.lock().insert(pending.id, pending)
    }

    /// Remove and return the entry for `id`
    pub fn pop(&self, id: u32) -> Option<PendingRequest> {
        self.entries.lock().remove(&id)
    }

    /// Remove every entry and hand each to `f`
    ///
    /// `f` runs after the lock is released.
    pub fn drain_all<F: FnMut(PendingRequest)>(&self, f: F) {
        let drained: Vec<PendingRequest> = {
            let mut entries = self.entries.lock();
            entries.drain().map(|(_, pending)| pending).collect()
        };
        drained.into_iter().for_each(f);
    }

    /// True while `id` is awaiting a response
    pub fn contains(&self, id: u32) -> bool {
        self.entries.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
