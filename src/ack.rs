//! ACK construction for non-2xx final responses to `INVITE` (RFC 3261
//! §17.1.1.3).
//!
//! This is the only message the client transaction layer is allowed to
//! build itself; every other outbound message originates with the Core.

use crate::headers::{CallId, From, To};
use crate::message::{Request, RequestUri, Response, SipMethod};

/// Builds the ACK for a non-2xx final `response` to the INVITE `request`.
///
/// Per §17.1.1.3, the ACK shares the INVITE's branch (it is not a new
/// transaction) and therefore copies `Via` verbatim rather than minting a
/// fresh one; `To` is overwritten with the tag the UAS assigned in
/// `response`, `Max-Forwards` is always `70`, and `Route` is carried over
/// unchanged iff present on the original request.
pub fn build_ack(request: &Request, response: &Response) -> Request {
    let to = match &response.to.tag {
        Some(tag) => To::with_tag(request.to.uri.clone(), tag.clone()),
        None => To::new(request.to.uri.clone()),
    };

    Request {
        method: SipMethod::Ack,
        request_uri: RequestUri(request.request_uri.0.clone()),
        via: request.via.clone(),
        from: From::new(request.from.uri.clone(), request.from.tag.clone()),
        to,
        call_id: CallId::new(request.call_id.0.clone()),
        cseq: request.cseq,
        max_forwards: 70,
        route: request.route.clone(),
        contact: None,
    }
}
