//! Request ID sequence

use std::sync::atomic::{AtomicU32, Ordering};

/// Monotonic u32 request IDs starting at 1
///
/// After `u32::MAX` the sequence continues at 1; 0 is never issued.
#[derive(Debug, Default)]
pub struct RequestIdSequence {
    last: AtomicU32,
}

impl RequestIdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence whose first ID follows `last`
    pub fn starting_after(last: u32) -> Self {
        Self {
            last: AtomicU32::new(last),
        }
    }

    /// Make the next ID follow `last`
    #[cfg(test)]
    pub(crate) fn rewind(&self, last: u32) {
        self.last.store(last, Ordering::Relaxed);
    }

    pub fn next(&self) -> u32 {
        let previous = self
            .last
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| Some(following(id)))
            .unwrap_or_else(|id| id);
        following(previous)
    }
}

fn following(id: u32) -> u32 {
    if id == u32::MAX {
        1
    } else {
        id + 1
    }
}
