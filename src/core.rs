//! The `Core` (TU — Transaction User) collaborator boundary.
//!
//! The Core is the sink for everything a client transaction reports:
//! provisional/final responses, transport errors, timeouts, and the
//! transaction's eventual termination. Call control, dialog management and
//! registration logic live above this boundary and are out of scope here.

use std::sync::Arc;

use crate::message::Response;
use crate::transaction::TsxId;

/// Why a transaction reached `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Final 2xx for INVITE, `completed`-dwell expiry, or an immediate
    /// reliable-transport terminate.
    Normal,
    /// `Timeout`, `TransportError`, or external `Shutdown`.
    Abnormal,
}

/// Sink for the events a client transaction reports to its Core.
///
/// `on_response` is always invoked *before* the FSM's own state transition
/// for the response that triggered it, so the Core observes provisional
/// responses even for transactions that immediately terminate on the same
/// event (§6.2).
#[async_trait::async_trait]
pub trait Core: Send + Sync + 'static {
    /// A provisional or final response arrived.
    async fn on_response(&self, tsx: TsxId, response: Response);

    /// The transport failed to deliver the request or the ACK.
    async fn on_transport_error(&self, tsx: TsxId, reason: String);

    /// `Timer B` or `Timer F` expired with no final response.
    async fn on_timeout(&self, tsx: TsxId);

    /// The transaction has reached `Terminated`; the Registry should drop
    /// its entry for `tsx` now.
    async fn on_terminated(&self, tsx: TsxId, how: Termination);
}

/// Shared handle to a Core, as stored on `TransactionData`.
pub type CoreHandle = Arc<dyn Core>;

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use tokio::sync::Mutex;

    /// Records every callback it receives, in order, for assertion in
    /// tests.
    #[derive(Debug, Clone)]
    pub enum Observed {
        Response(Response),
        TransportError(String),
        Timeout,
        Terminated(Termination),
    }

    #[derive(Default)]
    pub struct MockCore {
        pub events: Mutex<Vec<Observed>>,
    }

    impl MockCore {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub async fn events(&self) -> Vec<Observed> {
            self.events.lock().await.clone()
        }
    }

    #[async_trait::async_trait]
    impl Core for MockCore {
        async fn on_response(&self, _tsx: TsxId, response: Response) {
            self.events.lock().await.push(Observed::Response(response));
        }

        async fn on_transport_error(&self, _tsx: TsxId, reason: String) {
            self.events.lock().await.push(Observed::TransportError(reason));
        }

        async fn on_timeout(&self, _tsx: TsxId) {
            self.events.lock().await.push(Observed::Timeout);
        }

        async fn on_terminated(&self, _tsx: TsxId, how: Termination) {
            self.events.lock().await.push(Observed::Terminated(how));
        }
    }
}
