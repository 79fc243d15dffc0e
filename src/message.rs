//! Owned SIP request/response types.
//!
//! Wire parsing and serialization belong to the collaborator referred to as
//! the *MessageCodec* and are out of scope for this crate: a `Request` or
//! `Response` here is assumed already parsed and well-formed by the time it
//! reaches a transaction.

use std::fmt;

use crate::headers::{CallId, Contact, From, Route, To, Via};

/// The SIP methods this layer needs to name explicitly.
///
/// Other methods (`REGISTER`, `OPTIONS`, `BYE`, ...) are represented by
/// `Other`, since the non-INVITE client FSM treats every method identically
/// save for INVITE and ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SipMethod {
    /// `INVITE` — establishes a session; drives the INVITE client FSM.
    Invite,
    /// `ACK` — acknowledges a final response to `INVITE`; never dispatched
    /// as its own client transaction.
    Ack,
    /// `CANCEL` — drives the non-INVITE client FSM like any other method.
    Cancel,
    /// `BYE` — drives the non-INVITE client FSM.
    Bye,
    /// `REGISTER` — drives the non-INVITE client FSM.
    Register,
    /// Any other method name, carried verbatim.
    Other(&'static str),
}

impl fmt::Display for SipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SipMethod::Invite => write!(f, "INVITE"),
            SipMethod::Ack => write!(f, "ACK"),
            SipMethod::Cancel => write!(f, "CANCEL"),
            SipMethod::Bye => write!(f, "BYE"),
            SipMethod::Register => write!(f, "REGISTER"),
            SipMethod::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A SIP status code in `[100, 699]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl StatusCode {
    /// Builds a `StatusCode`, clamping to the valid RFC 3261 range.
    ///
    /// The MessageCodec is responsible for rejecting genuinely malformed
    /// status lines before they reach the transaction layer; this
    /// constructor only guards against the range invariant documented in
    /// §3 of the data model.
    pub fn new(code: u16) -> Self {
        debug_assert!((100..=699).contains(&code), "status code out of range: {code}");
        StatusCode(code)
    }

    /// The raw numeric status code.
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// The status class: `status_code / 100`, in `1..=6`.
    pub fn class(&self) -> u16 {
        self.0 / 100
    }

    /// `true` for `1xx` provisional responses.
    pub fn is_provisional(&self) -> bool {
        self.class() == 1
    }

    /// `true` for `2xx` success responses.
    pub fn is_success(&self) -> bool {
        self.class() == 2
    }

    /// `true` for any final response (class `>= 2`).
    pub fn is_final(&self) -> bool {
        self.class() >= 2
    }
}

impl From<u16> for StatusCode {
    fn from(value: u16) -> Self {
        StatusCode::new(value)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The request-line target of a `Request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUri(pub String);

impl fmt::Display for RequestUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable, already-parsed SIP request.
///
/// `request` fields are never mutated after construction anywhere in this
/// crate (§3 invariant); building a derived request (the ACK) always
/// produces a new `Request` value.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// The method named in the request-line.
    pub method: SipMethod,
    /// The request-URI.
    pub request_uri: RequestUri,
    /// The top (and, for this layer's purposes, only relevant) `Via`.
    pub via: Via,
    /// The `From` header.
    pub from: From,
    /// The `To` header.
    pub to: To,
    /// The `Call-ID` header.
    pub call_id: CallId,
    /// Sequence number of the `CSeq` header (the method is implied by
    /// `self.method` for an original request).
    pub cseq: u32,
    /// `Max-Forwards` header value.
    pub max_forwards: u8,
    /// `Route` header set, empty if absent.
    pub route: Vec<Route>,
    /// `Contact` header, if present.
    pub contact: Option<Contact>,
}

impl Request {
    /// Convenience constructor for building well-formed test/demo requests.
    /// `Max-Forwards` defaults to `70`, the conventional SIP value.
    pub fn new(
        method: SipMethod,
        request_uri: impl Into<String>,
        via: Via,
        from: From,
        to: To,
        call_id: CallId,
        cseq: u32,
    ) -> Self {
        Self {
            method,
            request_uri: RequestUri(request_uri.into()),
            via,
            from,
            to,
            call_id,
            cseq,
            max_forwards: 70,
            route: Vec::new(),
            contact: None,
        }
    }
}

/// An immutable, already-parsed SIP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// The numeric status code.
    pub status_code: StatusCode,
    /// The reason phrase.
    pub reason: String,
    /// The `To` header, whose `tag` (once present) identifies the UAS leg.
    pub to: To,
}

impl Response {
    /// Builds a response with a default reason phrase for the given code.
    pub fn new(status_code: impl Into<StatusCode>, reason: impl Into<String>, to: To) -> Self {
        Self {
            status_code: status_code.into(),
            reason: reason.into(),
            to,
        }
    }
}
