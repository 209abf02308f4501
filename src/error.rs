//! Error types for the tnt client
//!
//! Every failure is either a connection error (the transport could not
//! deliver an answer) or a query error (the request was rejected, could not
//! be encoded, or the answer could not be decoded).

use thiserror::Error;

/// Result type alias using TntError
pub type Result<T> = std::result::Result<T, TntError>;

/// Unified error type for client operations
#[derive(Debug, Error)]
pub enum TntError {
    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request send timeout")]
    RequestTimeout,

    #[error("Response read timeout")]
    ResponseTimeout,

    #[error("Shred old requests")]
    ShredOldRequests,

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    /// Non-zero return code reported by the server
    #[error("{message}")]
    Server { code: u32, message: String },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TntError {
    /// Transport-level failure: the request may or may not have reached the server
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TntError::Io(_)
                | TntError::ConnectionClosed
                | TntError::RequestTimeout
                | TntError::ResponseTimeout
                | TntError::ShredOldRequests
        )
    }

    /// Protocol-level failure
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            TntError::Server { .. } | TntError::Encode(_) | TntError::Decode(_)
        )
    }
}
