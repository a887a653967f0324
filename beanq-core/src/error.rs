//! Error types for the beanq core.
//!
//! Client mistakes never surface as `BeanqError`: the dispatcher turns
//! them into a protocol reply. `BeanqError` covers failures that end a
//! connection or keep the listener from starting.

use std::net::SocketAddr;

use thiserror::Error;

/// The canonical error type for the beanq core.
#[derive(Debug, Error)]
pub enum BeanqError {
    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

// ── CommandError ─────────────────────────────────────────────────

/// Why a command line could not be turned into a [`Command`](crate::Command).
///
/// Every variant is answered with `BAD_FORMAT`; the variants exist so the
/// reason shows up in logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The line had the wrong number of whitespace-separated fields.
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    /// A numeric field was not an unsigned 32-bit decimal.
    #[error("field `{field}` is not a valid unsigned integer")]
    InvalidNumber { field: &'static str },
}
