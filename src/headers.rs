//! Minimal owned header value types.
//!
//! Only the fields the client transaction FSMs and the [`crate::ack`]
//! builder actually read or write are modeled. Full header parsing
//! (parameters beyond `tag`/`branch`, folding, multiple header instances,
//! ...) is the MessageCodec's concern and stays out of this crate.

use std::fmt;

/// `Via` header: transport, sent-by, and the `branch` parameter that
/// identifies the transaction end-to-end (RFC 3261 §17.1.3, §8.1.1.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via {
    /// e.g. `"UDP"`, `"TCP"`, `"TLS"`.
    pub transport: String,
    /// `host[:port]` the request was sent from.
    pub sent_by: String,
    /// The `branch` parameter, including the `z9hG4bK` magic cookie.
    pub branch: String,
}

impl Via {
    /// Builds a `Via` for the given transport/sent-by/branch.
    pub fn new(transport: impl Into<String>, sent_by: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            sent_by: sent_by.into(),
            branch: branch.into(),
        }
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIP/2.0/{} {};branch={}", self.transport, self.sent_by, self.branch)
    }
}

/// `From` header: address-of-record plus the `tag` identifying the UAC leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct From {
    /// The address-of-record URI.
    pub uri: String,
    /// The `tag` parameter.
    pub tag: String,
}

impl From {
    /// Builds a `From` header.
    pub fn new(uri: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            tag: tag.into(),
        }
    }
}

/// `To` header: address-of-record plus an optional remote `tag`.
///
/// The remote `tag` is absent on the request's own `To` and is assigned by
/// the UAS in its response; [`crate::ack::build_ack`] copies it across.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct To {
    /// The address-of-record URI.
    pub uri: String,
    /// The `tag` parameter, if the UAS has assigned one.
    pub tag: Option<String>,
}

impl To {
    /// Builds a `To` header without a tag.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            tag: None,
        }
    }

    /// Builds a `To` header carrying a remote tag.
    pub fn with_tag(uri: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            tag: Some(tag.into()),
        }
    }
}

/// `Call-ID` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallId(pub String);

impl CallId {
    /// Builds a `Call-ID` from the given value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single `Route` entry, copied verbatim onto the ACK when present on the
/// original request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route(pub String);

/// `Contact` header, carried for completeness; unused by the FSMs
/// themselves but part of the request surface a Core typically sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact(pub String);
