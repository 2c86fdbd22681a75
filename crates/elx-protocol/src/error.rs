//! Error taxonomy for the protocol and connection layers.
//!
//! Every fallible operation in this workspace resolves to exactly one of
//! these variants. Connection-level failures are fatal to the whole
//! connection; protocol, RPC, and timeout failures are scoped to a single
//! call or a single inbound message.

use crate::jsonrpc::RpcError;

/// Result type alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// DNS, TCP, or TLS failure while opening or tearing down the connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// The operation was attempted on a connection that is already closed.
    #[error("connection is already closed")]
    AlreadyClosed,

    /// Malformed or unclassifiable wire data. Scoped to the offending
    /// message unless it is a framing-level desync, which closes the
    /// connection.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The server answered this call with an error envelope. Scoped to the
    /// call that triggered it; the connection stays up.
    #[error("server error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),

    /// The caller-configured deadline for this call expired.
    #[error("request timed out")]
    Timeout,

    /// The connection terminated while the call was in flight.
    #[error("connection closed with the request still in flight")]
    ConnectionClosed,

    /// Transport-level read or write failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error terminates the connection as a whole, as opposed
    /// to failing a single call or message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::ConnectionClosed | Error::Io(_)
        )
    }
}
