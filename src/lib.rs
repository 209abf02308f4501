//! # tnt
//!
//! Client for the IPROTO binary protocol of an in-memory tuple store:
//! - Byte-exact request packing with a single allocation per request
//! - Any number of concurrent callers over one TCP connection
//! - Responses routed back by request ID, not arrival order
//! - Per-request timeouts and orderly drain on close
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Callers (Connection::execute)                │
//! └──────────┬──────────────────────────────────▲───────────────┘
//!            │ pack + register                  │ resolve
//!            ▼                                  │
//!   ┌─────────────────┐                ┌────────┴────────┐
//!   │ Outbound Queue  │                │  Pending Table  │
//!   └────────┬────────┘                └────────▲────────┘
//!            ▼                                  │
//!   ┌─────────────────┐                ┌────────┴────────┐
//!   │  Writer Thread  │──── socket ───▶│  Reader Thread  │
//!   └─────────────────┘                └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use tnt::{pack_u32, Connection, Insert, Options, Select};
//!
//! let conn = Connection::connect("127.0.0.1:2001/0", Options::default())?;
//! conn.execute(Insert::new(vec![pack_u32(1), pack_u32(42)]))?;
//! let tuples = conn.execute(Select::by_value(pack_u32(1)))?;
//! assert_eq!(tuples.len(), 1);
//! # Ok::<(), tnt::TntError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod memcache;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TntError, Result};
pub use config::{Address, Options, OptionsBuilder};
pub use network::{connect, Connection};
pub use memcache::Memcache;
pub use protocol::{
    pack_u32, pack_u64, unpack_u32, unpack_u64, Call, Delete, Field, Insert, Keys, OpCode,
    Operator, Request, Select, Space, Tuple, Update,
};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
