//! Network Module
//!
//! Connection engine and lifecycle.
//!
//! ## Architecture
//! - Callers pack requests and register them in the pending table
//! - Writer thread drains the outbound queue into a buffered socket
//! - Reader thread frames responses and resolves pending requests by ID
//! - Supervisor thread owns the socket generations and the shutdown drain

mod connection;
mod pending;
mod request_id;
mod signal;
mod worker;

pub use connection::{connect, Connection};
pub use pending::{PendingRequest, PendingTable, Reply};
pub use request_id::RequestIdSequence;
