//! Crate-wide error type and `Result` alias.

use thiserror::Error;

/// Result alias used throughout the transaction layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client transaction layer.
///
/// `TransportError`, `Timeout` and `Shutdown` are the three terminal kinds
/// described by the transaction layer's error handling design: each one,
/// once raised, drives the owning transaction to `Terminated`.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport failed to send a request or ACK.
    #[error("transport error: {0}")]
    TransportError(String),

    /// `Timer B` (INVITE) or `Timer F` (non-INVITE) expired before a final
    /// response arrived.
    #[error("transaction timed out")]
    Timeout,

    /// The transaction was shut down by an external signal rather than by
    /// the normal RFC 3261 termination conditions.
    #[error("transaction shut down: {0}")]
    Shutdown(String),

    /// The dispatcher was asked to start a client transaction for `ACK`,
    /// which is never dispatched as its own transaction (RFC 3261 §17.1).
    #[error("ACK is not dispatched as a client transaction")]
    InvalidMethod,

    /// The transaction's event loop has already exited; the handle is stale.
    #[error("transaction channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ChannelClosed
    }
}
