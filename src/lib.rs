//! # sip-client-tsx
//!
//! RFC 3261 §17.1 client transaction state machines: INVITE and non-INVITE.
//!
//! This crate owns exactly the client transaction layer — the two state
//! machines, their timers, and the ACK it builds for non-2xx final
//! responses to INVITE. It does not parse or serialize SIP messages, manage
//! dialogs, resolve DNS, or open sockets; those collaborators are named as
//! the [`transport::Transport`] and [`core::Core`] traits and are supplied
//! by the embedding application.

pub mod ack;
pub mod config;
pub mod core;
pub mod error;
pub mod headers;
pub mod message;
pub mod transport;

mod timer;

pub mod transaction;

pub use config::TransactionConfig;
pub use core::{Core, CoreHandle, Termination};
pub use error::{Error, Result};
pub use transaction::{start, TransactionHandle, TsxId, TsxKey};
pub use transport::{Transport, TransportHandle};
