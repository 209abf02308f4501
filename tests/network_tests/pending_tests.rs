//! Pending Table Tests
//!
//! Registration, removal and drain of in-flight requests, plus the request
//! ID sequence.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use tnt::network::{PendingRequest, PendingTable, RequestIdSequence};
use tnt::protocol::Response;
use tnt::TntError;

fn entry(id: u32) -> (PendingRequest, crossbeam::channel::Receiver<tnt::network::Reply>) {
    PendingRequest::new(id, Bytes::from(id.to_le_bytes().to_vec()))
}

// =============================================================================
// Pending Table
// =============================================================================

#[test]
fn test_put_and_pop() {
    let table = PendingTable::new();
    let (pending, replies) = entry(7);

    assert!(table.put(pending).is_none());
    assert_eq!(table.len(), 1);

    let popped = table.pop(7).unwrap();
    assert_eq!(popped.id(), 7);
    assert_eq!(&popped.raw()[..], &7u32.to_le_bytes());
    assert!(table.is_empty());

    popped.resolve(Ok(Response::Tuples(vec![])));
    assert_eq!(replies.recv().unwrap().unwrap(), Response::Tuples(vec![]));
}

#[test]
fn test_pop_missing() {
    let table = PendingTable::new();
    assert!(table.pop(1).is_none());

    let (pending, _replies) = entry(1);
    table.put(pending);
    assert!(table.pop(1).is_some());
    assert!(table.pop(1).is_none());
}

#[test]
fn test_put_evicts_same_id() {
    let table = PendingTable::new();
    let (old, old_replies) = entry(3);
    let (new, new_replies) = entry(3);

    table.put(old);
    let evicted = table.put(new).unwrap();
    evicted.resolve(Err(TntError::ShredOldRequests));

    assert!(matches!(old_replies.recv().unwrap(), Err(TntError::ShredOldRequests)));
    assert_eq!(table.len(), 1);

    // The newer entry is the one left behind
    table.pop(3).unwrap().resolve(Ok(Response::Tuples(vec![])));
    assert!(new_replies.recv().unwrap().is_ok());
}

#[test]
fn test_drain_all() {
    let table = PendingTable::new();
    let receivers: Vec<_> = (1..=5)
        .map(|id| {
            let (pending, replies) = entry(id);
            table.put(pending);
            replies
        })
        .collect();

    let mut drained = Vec::new();
    table.drain_all(|pending| {
        drained.push(pending.id());
        pending.resolve(Err(TntError::ConnectionClosed));
    });

    drained.sort_unstable();
    assert_eq!(drained, vec![1, 2, 3, 4, 5]);
    assert!(table.is_empty());
    for replies in receivers {
        assert!(matches!(replies.recv().unwrap(), Err(TntError::ConnectionClosed)));
    }
}

#[test]
fn test_drain_callback_may_touch_table() {
    let table = PendingTable::new();
    let (pending, _replies) = entry(1);
    table.put(pending);

    // Runs outside the lock, so re-entering the table must not deadlock
    table.drain_all(|pending| {
        assert!(table.pop(pending.id()).is_none());
        assert_eq!(table.len(), 0);
    });
}

#[test]
fn test_resolve_after_caller_gone() {
    let (pending, replies) = entry(9);
    drop(replies);
    pending.resolve(Err(TntError::ResponseTimeout));
}

#[test]
fn test_concurrent_pop_resolves_once() {
    let table = Arc::new(PendingTable::new());
    let mut receivers = Vec::new();
    for id in 0..200 {
        let (pending, replies) = entry(id);
        table.put(pending);
        receivers.push(replies);
    }

    let resolved = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let table = Arc::clone(&table);
            let resolved = Arc::clone(&resolved);
            thread::spawn(move || {
                for id in 0..200 {
                    if let Some(pending) = table.pop(id) {
                        resolved.fetch_add(1, Ordering::SeqCst);
                        pending.resolve(Ok(Response::Tuples(vec![])));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(resolved.load(Ordering::SeqCst), 200);
    for replies in receivers {
        assert!(replies.recv().unwrap().is_ok());
        assert!(replies.try_recv().is_err());
    }
}

// =============================================================================
// Request IDs
// =============================================================================

#[test]
fn test_request_ids_start_at_one() {
    let ids = RequestIdSequence::new();
    assert_eq!(ids.next(), 1);
    assert_eq!(ids.next(), 2);
    assert_eq!(ids.next(), 3);
}

#[test]
fn test_request_ids_wrap_past_zero() {
    let ids = RequestIdSequence::starting_after(u32::MAX - 1);
    assert_eq!(ids.next(), u32::MAX);
    assert_eq!(ids.next(), 1);
    assert_eq!(ids.next(), 2);
}

#[test]
fn test_request_ids_unique_across_threads() {
    let ids = Arc::new(RequestIdSequence::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ids = Arc::clone(&ids);
            thread::spawn(move || (0..1000).map(|_| ids.next()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert_ne!(id, 0);
            assert!(seen.insert(id), "duplicate id {}", id);
        }
    }
    assert_eq!(seen.len(), 8000);
    assert_eq!(*seen.iter().max().unwrap(), 8000);
}
