//! Transaction timer configuration (RFC 3261 §17.1, Table of timer values).

use std::time::Duration;

/// The six timer knobs a client transaction is built from, plus their
/// derived absolute deadlines.
///
/// Constructed programmatically by the embedding application; this crate
/// does not read configuration files or environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Base retransmit interval for non-INVITE (`Timer E` start, `Timer F`
    /// scale). RFC default is 500ms.
    pub t1: Duration,
    /// Retransmit cap for non-INVITE (`Timer E` pinned value in
    /// `proceeding`).
    pub t2: Duration,
    /// Base retransmit interval for INVITE (`Timer A` start, `Timer B`
    /// scale).
    ///
    /// Defaults to 600ms rather than the RFC-literal 500ms, per this
    /// crate's spec; both keep `Timer B` within the RFC's 32-64s Timeout
    /// window, so this is exposed as a knob rather than hardcoded either way
    /// (see `DESIGN.md`).
    pub invite_t1: Duration,
    /// INVITE `completed` dwell on unreliable transports (`Timer D`),
    /// minimum 32s per RFC.
    pub timer_d: Duration,
    /// Non-INVITE `completed` dwell on unreliable transports (`Timer K`).
    pub timer_k: Duration,
}

impl TransactionConfig {
    /// `Timer B`: INVITE transaction timeout, `64 * invite_t1`.
    pub fn timer_b(&self) -> Duration {
        self.invite_t1 * 64
    }

    /// `Timer F`: non-INVITE absolute deadline, `64 * t1`.
    pub fn timer_f(&self) -> Duration {
        self.t1 * 64
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            t1: Duration::from_millis(500),
            t2: Duration::from_secs(4),
            invite_t1: Duration::from_millis(600),
            timer_d: Duration::from_secs(32),
            timer_k: Duration::from_secs(5),
        }
    }
}
