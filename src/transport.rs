//! The `Transport` collaborator boundary.
//!
//! Everything this crate needs from a transport: fire-and-forget sends, and
//! whether the transport is reliable enough to skip transaction-layer
//! retransmission. Connection management, DNS/SRV resolution, and framing
//! are the Transport implementation's concern, not this crate's.

use std::sync::Arc;

use crate::error::Result;
use crate::message::Request;

/// A send target for a client transaction: request and ACK messages go out
/// through the same `Transport` for the lifetime of the transaction.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends `message`. Fire-and-forget: a failure here is reported to the
    /// Core via `on_transport_error`, not returned synchronously to the
    /// caller that triggered the send.
    async fn send(&self, message: &Request) -> Result<()>;

    /// `true` for stream-oriented transports (TCP, TLS, SCTP) whose
    /// delivery guarantees make transaction-layer retransmission and the
    /// `completed`-state dwell unnecessary. `false` for datagram transports
    /// (UDP).
    fn reliable(&self) -> bool;
}

/// Shared handle to a transport, as stored on `TransactionData`.
pub type TransportHandle = Arc<dyn Transport>;
