//! The INVITE client transaction state machine (RFC 3261 §17.1.1).
//!
//! `Calling → Proceeding? → Completed? → Terminated`. Unlike the non-INVITE
//! FSM, a 2xx final response terminates the transaction immediately rather
//! than entering `Completed` — ACK for a 2xx is the Core's responsibility
//! (it rides the dialog, not the transaction), while ACK for every other
//! final response is built and sent right here.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::ack::build_ack;
use crate::config::TransactionConfig;
use crate::core::{CoreHandle, Termination};
use crate::message::Request;
use crate::timer::{TimerGenerations, TimerService, TimerSlot};
use crate::transport::TransportHandle;

use super::{Inbound, TsxId, TsxKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Calling,
    Proceeding,
    Completed,
    Terminated,
}

pub(crate) fn spawn(
    id: TsxId,
    key: TsxKey,
    request: Request,
    transport: TransportHandle,
    core: CoreHandle,
    config: TransactionConfig,
    inbound: mpsc::Receiver<Inbound>,
    retransmit_count: Arc<AtomicU32>,
) {
    tokio::spawn(run(id, key, request, transport, core, config, inbound, retransmit_count));
}

async fn run(
    id: TsxId,
    key: TsxKey,
    request: Request,
    transport: TransportHandle,
    core: CoreHandle,
    config: TransactionConfig,
    mut inbound: mpsc::Receiver<Inbound>,
    retransmit_count: Arc<AtomicU32>,
) {
    let (timer_tx, mut timer_rx) = mpsc::channel(4);
    let timers = TimerService::new(timer_tx);
    let mut timer_gen = TimerGenerations::default();

    if let Err(err) = transport.send(&request).await {
        log::debug!("{key} failed to send initial INVITE: {err}");
        core.on_transport_error(id, err.to_string()).await;
        core.on_terminated(id, Termination::Abnormal).await;
        return;
    }

    let mut state = State::Calling;
    let mut retries: u32 = 0;
    // Built exactly once, on the first non-2xx final response, and resent
    // byte-for-byte on every subsequent Completed-state retransmission.
    let mut ack: Option<Request> = None;

    let mut retry_timer = (!transport.reliable()).then(|| timer_gen.arm_retry(&timers, config.invite_t1));
    let mut deadline_timer = Some(timer_gen.arm_deadline(&timers, config.timer_b()));

    loop {
        tokio::select! {
            inbound_event = inbound.recv() => {
                let Some(inbound_event) = inbound_event else {
                    log::debug!("{key} transaction handle dropped while in {state:?}");
                    return;
                };

                let response = match inbound_event {
                    Inbound::Response(response) => response,
                    Inbound::Error(reason) => {
                        core.on_transport_error(id, reason).await;
                        core.on_terminated(id, Termination::Abnormal).await;
                        return;
                    }
                    Inbound::Shutdown(reason) => {
                        log::info!("{key} shut down: {reason}");
                        core.on_terminated(id, Termination::Abnormal).await;
                        return;
                    }
                };
                let status = response.status_code;
                log::trace!("{key} received {status} while in {state:?}");

                match state {
                    State::Calling | State::Proceeding => {
                        if status.is_provisional() {
                            state = State::Proceeding;
                            core.on_response(id, response).await;
                        } else if status.is_success() {
                            retry_timer = None;
                            deadline_timer = None;
                            state = State::Terminated;
                            core.on_response(id, response).await;
                            core.on_terminated(id, Termination::Normal).await;
                            return;
                        } else {
                            retry_timer = None;
                            let built = build_ack(&request, &response);
                            core.on_response(id, response).await;
                            if let Err(err) = transport.send(&built).await {
                                core.on_transport_error(id, err.to_string()).await;
                                core.on_terminated(id, Termination::Abnormal).await;
                                return;
                            }
                            ack = Some(built);
                            state = State::Completed;
                            if transport.reliable() {
                                deadline_timer = None;
                                core.on_terminated(id, Termination::Normal).await;
                                return;
                            }
                            deadline_timer = Some(timer_gen.arm_deadline(&timers, config.timer_d));
                        }
                    }
                    State::Completed => {
                        // §17.1.1.2: a retransmitted non-2xx final response
                        // re-triggers the ACK; the response itself is not
                        // passed up to the Core again. The ACK built on
                        // Completed-entry is reused verbatim, never rebuilt.
                        if status.is_final() && !status.is_success() {
                            if let Some(ack) = ack.as_ref() {
                                if let Err(err) = transport.send(ack).await {
                                    core.on_transport_error(id, err.to_string()).await;
                                    core.on_terminated(id, Termination::Abnormal).await;
                                    return;
                                }
                            }
                        }
                    }
                    State::Terminated => {}
                }
            }

            fired = timer_rx.recv() => {
                let Some(fired) = fired else { return; };
                if !timer_gen.is_current(&fired) {
                    log::trace!("{key} ignoring stale {:?} timer", fired.slot);
                    continue;
                }

                match (fired.slot, state) {
                    (TimerSlot::Retry, State::Calling) => {
                        retries += 1;
                        retransmit_count.fetch_add(1, Ordering::Relaxed);
                        if let Err(err) = transport.send(&request).await {
                            core.on_transport_error(id, err.to_string()).await;
                            core.on_terminated(id, Termination::Abnormal).await;
                            return;
                        }
                        // Timer A doubles unboundedly (unlike non-INVITE's Timer E,
                        // it is not pinned at T2); Timer B's deadline, not a cap
                        // here, bounds how many times this fires.
                        let interval = config.invite_t1 * (1u32 << retries);
                        retry_timer = Some(timer_gen.arm_retry(&timers, interval));
                    }
                    (TimerSlot::Deadline, State::Calling) => {
                        state = State::Terminated;
                        retry_timer = None;
                        core.on_timeout(id).await;
                        core.on_terminated(id, Termination::Abnormal).await;
                        return;
                    }
                    (TimerSlot::Deadline, State::Completed) => {
                        state = State::Terminated;
                        core.on_terminated(id, Termination::Normal).await;
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::mock::{MockCore, Observed};
    use crate::headers::{CallId, From, To, Via};
    use crate::message::{Response, SipMethod};
    use crate::transport::mock::MockTransport;

    fn sample_invite() -> Request {
        Request::new(
            SipMethod::Invite,
            "sip:bob@example.com",
            Via::new("UDP", "127.0.0.1:5060", "z9hG4bK776asdhds"),
            From::new("sip:alice@example.com", "1928301774"),
            To::new("sip:bob@example.com"),
            CallId::new("a84b4c76e66710@pc33.example.com"),
            1,
        )
    }

    fn start(transport: std::sync::Arc<MockTransport>, core: std::sync::Arc<MockCore>) -> super::super::TransactionHandle {
        super::super::start(
            sample_invite(),
            transport,
            core,
            TransactionConfig::default(),
        )
        .expect("INVITE dispatches")
    }

    #[tokio::test(start_paused = true)]
    async fn provisional_response_moves_to_proceeding_and_notifies_core() {
        let transport = MockTransport::unreliable();
        let core = MockCore::new();
        let handle = start(transport.clone(), core.clone());

        tokio::task::yield_now().await;
        handle
            .deliver_response(Response::new(180u16, "Ringing", To::new("sip:bob@example.com")))
            .await
            .unwrap();
        tokio::task::yield_now().await;

        assert!(matches!(core.events().await.as_slice(), [Observed::Response(r)] if r.status_code.as_u16() == 180));
    }

    #[tokio::test(start_paused = true)]
    async fn non_2xx_final_response_sends_ack_and_dwells_for_timer_d() {
        let transport = MockTransport::unreliable();
        let core = MockCore::new();
        let handle = start(transport.clone(), core.clone());

        tokio::task::yield_now().await;
        handle
            .deliver_response(Response::new(486u16, "Busy Here", To::with_tag("sip:bob@example.com", "9fxced76sl")))
            .await
            .unwrap();
        tokio::task::yield_now().await;

        // INVITE, then ACK.
        assert_eq!(transport.send_count().await, 2);
        assert!(matches!(core.events().await.as_slice(), [Observed::Response(_)]));

        tokio::time::sleep(Duration::from_secs(32) + Duration::from_millis(1)).await;

        assert!(matches!(
            core.events().await.as_slice(),
            [Observed::Response(_), Observed::Terminated(Termination::Normal)]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_retransmission_resends_the_same_ack_object_not_a_rebuilt_one() {
        // S3's second clause: a retransmitted non-2xx final response while
        // Completed re-sends the exact ACK built on first entry, not a fresh
        // one built from whatever response just arrived.
        let transport = MockTransport::unreliable();
        let core = MockCore::new();
        let handle = start(transport.clone(), core.clone());

        tokio::task::yield_now().await;
        let final_response = Response::new(486u16, "Busy Here", To::with_tag("sip:bob@example.com", "9fxced76sl"));
        handle.deliver_response(final_response.clone()).await.unwrap();
        tokio::task::yield_now().await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.deliver_response(final_response).await.unwrap();
        tokio::task::yield_now().await;

        // INVITE, then ACK, then the retransmitted ACK.
        let sent = transport.sent.lock().await;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].method, SipMethod::Ack);
        assert_eq!(sent[2].method, SipMethod::Ack);
        assert_eq!(sent[1], sent[2], "retransmitted ACK must be byte-for-byte identical to the first");

        // Only the first final response is forwarded to the Core.
        assert!(matches!(core.events().await.as_slice(), [Observed::Response(_)]));
    }

    #[tokio::test(start_paused = true)]
    async fn success_response_terminates_immediately_without_completed_dwell() {
        let transport = MockTransport::unreliable();
        let core = MockCore::new();
        let handle = start(transport.clone(), core.clone());

        tokio::task::yield_now().await;
        handle
            .deliver_response(Response::new(200u16, "OK", To::with_tag("sip:bob@example.com", "9fxced76sl")))
            .await
            .unwrap();
        tokio::task::yield_now().await;

        assert!(matches!(
            core.events().await.as_slice(),
            [Observed::Response(_), Observed::Terminated(Termination::Normal)]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_a_retransmits_with_unbounded_doubling() {
        // Mirrors scenario S1: successive fires at 600, 1200, 2400, 4800,
        // 9600, 19200ms — doubling is never pinned at T2 the way Timer E is.
        let transport = MockTransport::unreliable();
        let core = MockCore::new();
        let _handle = start(transport.clone(), core.clone());

        tokio::task::yield_now().await;
        assert_eq!(transport.send_count().await, 1);

        tokio::time::sleep(Duration::from_millis(600 + 1)).await;
        assert_eq!(transport.send_count().await, 2);

        tokio::time::sleep(Duration::from_millis(1200 + 1)).await;
        assert_eq!(transport.send_count().await, 3);

        tokio::time::sleep(Duration::from_millis(2400 + 1)).await;
        assert_eq!(transport.send_count().await, 4);

        tokio::time::sleep(Duration::from_millis(4800 + 1)).await;
        assert_eq!(transport.send_count().await, 5);

        tokio::time::sleep(Duration::from_millis(9600 + 1)).await;
        assert_eq!(transport.send_count().await, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_b_times_out_at_cumulative_37_8_seconds() {
        // Scenario S1 in full: after the 6th retransmit at t=19200ms the
        // cumulative elapsed time (600+1200+2400+4800+9600+19200=37800ms)
        // falls short of the next doubling, so Timer B (38400ms) fires next.
        let transport = MockTransport::unreliable();
        let core = MockCore::new();
        let _handle = start(transport.clone(), core.clone());

        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(37_800)).await;
        assert_eq!(transport.send_count().await, 6);
        assert!(core.events().await.is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(matches!(
            core.events().await.as_slice(),
            [Observed::Timeout, Observed::Terminated(Termination::Abnormal)]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_b_times_out_an_unanswered_invite() {
        let transport = MockTransport::unreliable();
        let core = MockCore::new();
        let _handle = start(transport.clone(), core.clone());

        tokio::task::yield_now().await;
        tokio::time::sleep(TransactionConfig::default().timer_b() + Duration::from_millis(1)).await;

        assert!(matches!(
            core.events().await.as_slice(),
            [Observed::Timeout, Observed::Terminated(Termination::Abnormal)]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn reliable_transport_skips_timer_a_and_terminates_immediately_on_completed() {
        let transport = MockTransport::reliable();
        let core = MockCore::new();
        let handle = start(transport.clone(), core.clone());

        tokio::task::yield_now().await;
        handle
            .deliver_response(Response::new(486u16, "Busy Here", To::with_tag("sip:bob@example.com", "9fxced76sl")))
            .await
            .unwrap();
        tokio::task::yield_now().await;

        assert!(matches!(
            core.events().await.as_slice(),
            [Observed::Response(_), Observed::Terminated(Termination::Normal)]
        ));

        // No Timer A: a long sleep must not produce any further retransmits.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.send_count().await, 2);
    }
}
