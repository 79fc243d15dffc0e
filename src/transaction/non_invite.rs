//! The non-INVITE client transaction state machine (RFC 3261 §17.1.2).
//!
//! `Trying → Proceeding? → Completed? → Terminated`. Any final response
//! (2xx included) moves the transaction to `Completed`: unlike INVITE, a
//! non-INVITE client transaction never builds or sends an ACK.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::TransactionConfig;
use crate::core::{CoreHandle, Termination};
use crate::message::Request;
use crate::timer::{TimerGenerations, TimerService, TimerSlot};
use crate::transport::TransportHandle;

use super::{Inbound, TsxId, TsxKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Trying,
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
        log::debug!("{key} failed to send initial {}: {err}", request.method);
        core.on_transport_error(id, err.to_string()).await;
        core.on_terminated(id, Termination::Abnormal).await;
        return;
    }

    let mut state = State::Trying;
    let mut retries: u32 = 0;

    let mut retry_timer = (!transport.reliable()).then(|| timer_gen.arm_retry(&timers, config.t1));
    let mut deadline_timer = Some(timer_gen.arm_deadline(&timers, config.timer_f()));

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
                    State::Trying | State::Proceeding => {
                        if status.is_provisional() {
                            state = State::Proceeding;
                            core.on_response(id, response).await;
                        } else {
                            retry_timer = None;
                            deadline_timer = None;
                            state = State::Completed;
                            core.on_response(id, response).await;
                            if transport.reliable() {
                                core.on_terminated(id, Termination::Normal).await;
                                return;
                            }
                            deadline_timer = Some(timer_gen.arm_deadline(&timers, config.timer_k));
                        }
                    }
                    State::Completed | State::Terminated => {
                        // §17.1.2.2: retransmissions of the final response
                        // while Completed are absorbed silently; there is no
                        // request retransmission and no ACK to (re)send.
                    }
                }
            }

            fired = timer_rx.recv() => {
                let Some(fired) = fired else { return; };
                if !timer_gen.is_current(&fired) {
                    log::trace!("{key} ignoring stale {:?} timer", fired.slot);
                    continue;
                }

                match (fired.slot, state) {
                    (TimerSlot::Retry, State::Trying | State::Proceeding) => {
                        retries += 1;
                        retransmit_count.fetch_add(1, Ordering::Relaxed);
                        if let Err(err) = transport.send(&request).await {
                            core.on_transport_error(id, err.to_string()).await;
                            core.on_terminated(id, Termination::Abnormal).await;
                            return;
                        }
                        let interval = if state == State::Trying {
                            std::cmp::min(config.t1 * (1u32 << retries), config.t2)
                        } else {
                            config.t2
                        };
                        retry_timer = Some(timer_gen.arm_retry(&timers, interval));
                    }
                    (TimerSlot::Deadline, State::Trying | State::Proceeding) => {
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
