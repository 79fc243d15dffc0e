//! `TimerService` — one-shot timers with cancellation and stale-timer
//! tolerance.
//!
//! Each client transaction owns one `TimerService` bound to its own event
//! channel. Arming a timer spawns a task that sleeps for the requested
//! duration and then delivers a `TimerFired` event tagged with the
//! generation it was armed with; cancelling aborts that task, but RFC
//! 3261's §9 design note still requires the owning FSM to treat a
//! generation mismatch as a no-op, since an abort racing an
//! already-in-flight send is possible in principle.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Which logical timer slot fired.
///
/// A client transaction never has more than one retransmit timer and one
/// deadline/dwell timer live at once, so two slots suffice for both FSMs:
/// `Retry` covers `Timer A`/`Timer E`, `Deadline` covers `Timer B`/`Timer
/// F`/`Timer D`/`Timer K` (the latter two reuse the slot after the former
/// two have already fired or been cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSlot {
    /// `Timer A` (INVITE) / `Timer E` (non-INVITE): retransmit interval.
    Retry,
    /// `Timer B`/`Timer D` (INVITE) or `Timer F`/`Timer K` (non-INVITE):
    /// absolute deadline or completed-state dwell.
    Deadline,
}

/// A timer-fired event delivered back into the owning transaction's event
/// channel.
#[derive(Debug, Clone, Copy)]
pub struct TimerFired {
    /// Which slot fired.
    pub slot: TimerSlot,
    /// The generation it was armed with; the receiver discards this event
    /// if it no longer matches the generation currently expected for
    /// `slot`.
    pub generation: u64,
}

/// Schedules one-shot timers for a single transaction.
pub struct TimerService {
    sender: mpsc::Sender<TimerFired>,
}

impl TimerService {
    /// Builds a `TimerService` that delivers fired timers onto `sender`.
    pub fn new(sender: mpsc::Sender<TimerFired>) -> Self {
        Self { sender }
    }

    /// Arms `slot` to fire after `duration`, tagged with `generation`.
    /// Returns a handle that cancels the timer when dropped or explicitly
    /// cancelled.
    pub fn arm(&self, slot: TimerSlot, generation: u64, duration: Duration) -> TimerHandle {
        let sender = self.sender.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = sender.send(TimerFired { slot, generation }).await;
        });
        TimerHandle {
            abort: join.abort_handle(),
        }
    }
}

/// A handle to an armed timer. Cancelling is best-effort: see the module
/// doc comment on why the FSM must still check the generation.
pub struct TimerHandle {
    abort: AbortHandle,
}

impl TimerHandle {
    /// Cancels the timer. A no-op if it has already fired.
    ///
    /// Equivalent to dropping the handle; spelled out at call sites where a
    /// state transition explicitly retires a timer, for readability.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// Tracks the generation a transaction last armed each timer slot with, so a
/// `TimerFired` racing a cancellation (the arm/abort pair is not atomic with
/// the state transition that retires it) can be recognized as stale and
/// dropped instead of acted on.
#[derive(Debug, Default)]
pub struct TimerGenerations {
    retry: u64,
    deadline: u64,
}

impl TimerGenerations {
    /// Arms the retry slot (`Timer A`/`Timer E`), retiring any previous
    /// retry timer's generation.
    pub fn arm_retry(&mut self, service: &TimerService, duration: Duration) -> TimerHandle {
        self.retry += 1;
        service.arm(TimerSlot::Retry, self.retry, duration)
    }

    /// Arms the deadline slot (`Timer B`/`D`/`F`/`K`), retiring any previous
    /// deadline timer's generation.
    pub fn arm_deadline(&mut self, service: &TimerService, duration: Duration) -> TimerHandle {
        self.deadline += 1;
        service.arm(TimerSlot::Deadline, self.deadline, duration)
    }

    /// `true` if `fired` was armed with the generation currently expected
    /// for its slot, i.e. it is not stale.
    pub fn is_current(&self, fired: &TimerFired) -> bool {
        match fired.slot {
            TimerSlot::Retry => fired.generation == self.retry,
            TimerSlot::Deadline => fired.generation == self.deadline,
        }
    }
}
