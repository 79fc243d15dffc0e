//! Client transaction state machines (RFC 3261 §17.1) and the dispatcher
//! that starts them.
//!
//! This module owns only the two client-side FSMs named in §4.2/§4.3 of the
//! design: [`invite`] and [`non_invite`]. Server transactions, dialogs, and
//! the transaction-matching registry that indexes live transactions by
//! `branch`/method/sent-by are out of scope — this crate hands back a
//! [`TsxId`] and lets the embedder do its own bookkeeping.

pub mod invite;
pub mod non_invite;

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::CoreHandle;
use crate::error::{Error, Result};
use crate::message::{Request, Response, SipMethod};
use crate::transport::TransportHandle;

static NEXT_TSX_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a client transaction, handed to the Core on every
/// callback so it can correlate events without this crate exposing its
/// internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TsxId(u64);

impl TsxId {
    fn next() -> Self {
        Self(NEXT_TSX_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TsxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tsx{}", self.0)
    }
}

/// The RFC 3261 §17.1.3 transaction-matching key: `branch` plus the method
/// and sent-by that disambiguate a CANCEL or ACK sharing a branch with its
/// INVITE.
///
/// This crate never uses `TsxKey` to look anything up — a real transaction
/// registry living above this crate does that — it is carried purely so log
/// lines can name a transaction the way an operator reading a SIP trace
/// would expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TsxKey {
    branch: String,
    method: SipMethod,
    sent_by: String,
}

impl TsxKey {
    fn from_request(request: &Request) -> Self {
        Self {
            branch: request.via.branch.clone(),
            method: request.method,
            sent_by: request.via.sent_by.clone(),
        }
    }
}

impl fmt::Display for TsxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}@{}", self.branch, self.method, self.sent_by)
    }
}

/// An inbound event delivered to a running transaction from outside.
///
/// `Response` is the normal case; `Error` and `Shutdown` let the embedder
/// push an external failure or a graceful-shutdown request into the same
/// single-writer event pump a timer fire or a response would go through, so
/// the FSM never has to special-case where a termination came from.
#[derive(Debug)]
pub(crate) enum Inbound {
    Response(Response),
    Error(String),
    Shutdown(String),
}

/// A live client transaction's external handle.
///
/// Holds the sending half of the single `mpsc` channel the transaction's own
/// task reads from; dropping every `TransactionHandle` does not stop the
/// task (it runs to `Terminated` on its own), but delivery of further
/// responses becomes impossible once the task exits and closes its
/// receiver.
#[derive(Clone)]
pub struct TransactionHandle {
    id: TsxId,
    key: TsxKey,
    inbound: mpsc::Sender<Inbound>,
    retransmit_count: Arc<AtomicU32>,
}

impl TransactionHandle {
    /// The opaque id this transaction reports itself as to the Core.
    pub fn id(&self) -> TsxId {
        self.id
    }

    /// The RFC 3261 matching key this transaction was started with.
    pub fn key(&self) -> &TsxKey {
        &self.key
    }

    /// How many times the original request has been retransmitted so far.
    /// Diagnostic only — the FSM does not consult this value itself.
    pub fn retransmit_count(&self) -> u32 {
        self.retransmit_count.load(Ordering::Relaxed)
    }

    /// Delivers a response received from the network to this transaction.
    ///
    /// Returns [`Error::ChannelClosed`] if the transaction has already
    /// reached `Terminated` and its task has exited.
    pub async fn deliver_response(&self, response: Response) -> Result<()> {
        self.inbound
            .send(Inbound::Response(response))
            .await
            .map_err(Error::from)
    }

    /// Reports a transport failure observed outside the transaction's own
    /// `send` calls (e.g. a connection reset noticed asynchronously).
    /// Terminates the transaction abnormally.
    pub async fn deliver_error(&self, reason: impl Into<String>) -> Result<()> {
        self.inbound
            .send(Inbound::Error(reason.into()))
            .await
            .map_err(Error::from)
    }

    /// Requests that the transaction shut down immediately, bypassing its
    /// normal RFC 3261 termination conditions.
    pub async fn shutdown(&self, reason: impl Into<String>) -> Result<()> {
        self.inbound
            .send(Inbound::Shutdown(reason.into()))
            .await
            .map_err(Error::from)
    }
}

/// Starts a new client transaction for `request` and returns a handle to
/// feed it responses.
///
/// Dispatches to the INVITE or non-INVITE FSM based on `request.method`.
/// `ACK` is never dispatched as its own client transaction (RFC 3261
/// §17.1): it is built once, by [`crate::ack::build_ack`], against the
/// INVITE transaction that solicited a non-2xx final response, and sent
/// directly through the `Transport`.
pub fn start(
    request: Request,
    transport: TransportHandle,
    core: CoreHandle,
    config: crate::config::TransactionConfig,
) -> Result<TransactionHandle> {
    if request.method == SipMethod::Ack {
        return Err(Error::InvalidMethod);
    }

    let id = TsxId::next();
    let key = TsxKey::from_request(&request);
    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let retransmit_count = Arc::new(AtomicU32::new(0));

    let handle = TransactionHandle {
        id,
        key: key.clone(),
        inbound: inbound_tx,
        retransmit_count: retransmit_count.clone(),
    };

    if request.method == SipMethod::Invite {
        invite::spawn(id, key, request, transport, core, config, inbound_rx, retransmit_count);
    } else {
        non_invite::spawn(id, key, request, transport, core, config, inbound_rx, retransmit_count);
    }

    Ok(handle)
}
