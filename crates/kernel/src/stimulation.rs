// SPDX-License-Identifier: PolyForm-Shield-1.0

//! the live state of one `stimulate` call: the FIFO queue, the
//! concurrency-gated dispatch loop, and the listener fan-out. Everything
//! that mutates the queue or the in-flight counters happens on the single
//! future driven by [`Stimulation::poll`] — a Stimulation is confined to one
//! task rather than guarded by a shared mutex.

use std::collections::VecDeque;
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use cnstra_graph::GraphIndex;
use cnstra_protocol::{AnySignal, ContextHandle, DendriteError, DendriteOutcome, ErrorKind, KernelError, SignalBatch};

use crate::activation::ActivationTask;
use crate::cancellation::AbortSignal;
use crate::options::AllowType;
use crate::response::{ListenerOutcome, ResponseError, ResponseListener, ResponseProjection, SignalView, StimulationResponse};

/// terminal outcome of a Stimulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Completed,
    Cancelled,
    ListenerFailed,
}

/// shared, sync-readable status backing a [`Stimulation`]'s inspection API:
/// id, queue length, in-flight count, and the list of failed responses,
/// all readable without polling the future.
pub(crate) struct StimulationStatus {
    pub id: Arc<str>,
    pub queue_len: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub failed: Mutex<Vec<StimulationResponse>>,
    pub terminal: Mutex<Option<TerminalState>>,
}

impl StimulationStatus {
    pub fn new(id: Arc<str>) -> Arc<Self> {
        Arc::new(Self {
            id,
            queue_len: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            failed: Mutex::new(Vec::new()),
            terminal: Mutex::new(None),
        })
    }
}

/// one in-flight `stimulate` call. Implements [`Future`], resolving when the
/// Stimulation reaches terminal state; also exposes synchronous inspection
/// that reads live state regardless of poll progress.
///
/// because a dendrite's `Ready` outcome is handled inline, never touching
/// the concurrent dispatch set, a graph with only synchronous dendrites and
/// listeners never actually yields: the first call to `poll` drives the
/// whole run to completion without returning `Poll::Pending`.
pub struct Stimulation {
    status: Arc<StimulationStatus>,
    inner: Pin<Box<dyn Future<Output = Result<(), KernelError>> + Send>>,
}

impl Stimulation {
    pub(crate) fn new(
        status: Arc<StimulationStatus>,
        inner: Pin<Box<dyn Future<Output = Result<(), KernelError>> + Send>>,
    ) -> Self {
        Self { status, inner }
    }

    pub fn id(&self) -> &str {
        &self.status.id
    }

    pub fn queue_len(&self) -> usize {
        self.status.queue_len.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> usize {
        self.status.in_flight.load(Ordering::Relaxed)
    }

    pub fn failed_responses(&self) -> Vec<StimulationResponse> {
        self.status.failed.lock().expect("status lock poisoned").clone()
    }

    /// `None` until the run reaches terminal state.
    pub fn terminal_state(&self) -> Option<TerminalState> {
        *self.status.terminal.lock().expect("status lock poisoned")
    }
}

impl Future for Stimulation {
    type Output = Result<(), KernelError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

/// outcome of an awaited (`Pending`) dendrite invocation once it settles.
enum Settlement {
    Resolved(Result<SignalBatch, DendriteError>),
    TimedOut,
}

struct Settled {
    task: ActivationTask,
    settlement: Settlement,
}

type ListenerFutures = FuturesUnordered<BoxFuture<'static, Vec<Result<(), String>>>>;

/// builds the sequence of seed activations: each seed signal fans out to
/// its subscribers in Graph Index order, in the order the seed signals
/// themselves were given.
fn seed_activations(graph: &GraphIndex, seeds: Vec<AnySignal>, allow_type: &Option<AllowType>, queue: &mut VecDeque<ActivationTask>) {
    for seed in seeds {
        enqueue_fanout(graph, allow_type, queue, seed, 0, None);
    }
}

/// fan one emitted signal out to its subscribers.
///
/// a collateral with no subscribers is silently dropped — an unsubscribed
/// collateral and an unknown one collapse to the same observable outcome
/// here, since this graph has no collateral registry separate from
/// dendrite subscriptions to tell the two apart. The distinct
/// `UnknownCollateral` error is instead produced at
/// [`cnstra_protocol::Axon::emit`], which is the concrete point a program
/// error of that kind is detectable.
fn enqueue_fanout(
    graph: &GraphIndex,
    allow_type: &Option<AllowType>,
    queue: &mut VecDeque<ActivationTask>,
    signal: AnySignal,
    hop: u32,
    parent_hop: Option<u32>,
) {
    if let Some(predicate) = allow_type {
        if !predicate(&signal.collateral_id) {
            return;
        }
    }
    let subscribers = graph.dendrites_for(&signal.collateral_id);
    if subscribers.is_empty() {
        return;
    }
    let shared = Arc::new(signal);
    for &dendrite_idx in subscribers {
        queue.push_back(ActivationTask::new(dendrite_idx, shared.clone(), hop, parent_hop));
    }
}

/// turns a settled dendrite result into a response's output view and error,
/// enqueuing child activations for every produced signal along the way.
/// Outputs are discarded without being enqueued when `cancelled` is true:
/// in-flight dispatches are awaited to completion, but their produced
/// outputs never re-enter the queue.
fn finalize_result(
    task: &ActivationTask,
    result: Result<SignalBatch, DendriteError>,
    cancelled: bool,
    graph: &GraphIndex,
    allow_type: &Option<AllowType>,
    queue: &mut VecDeque<ActivationTask>,
) -> (Option<SignalView>, Option<ResponseError>) {
    if cancelled {
        return (None, Some(ResponseError::new(ErrorKind::Cancelled, "stimulation cancelled")));
    }
    match result {
        Ok(signals) => {
            let representative = if signals.len() == 1 {
                Some(SignalView {
                    collateral_id: signals[0].collateral_id.clone(),
                    payload_present: signals[0].payload.is_some(),
                })
            } else {
                None
            };
            for signal in signals {
                enqueue_fanout(graph, allow_type, queue, signal, task.hop + 1, Some(task.hop));
            }
            (representative, None)
        }
        Err(error) => {
            let kind = error.kind();
            (None, Some(ResponseError::new(kind, error.to_string())))
        }
    }
}

/// run every listener for one response, feeding sync errors into
/// `first_listener_error` immediately and queuing async ones to be awaited
/// later. The listener future set is never allocated when every listener
/// resolves synchronously.
fn fan_out(
    listeners: &[Arc<dyn ResponseListener>],
    listener_futures: &mut ListenerFutures,
    first_listener_error: &mut Option<String>,
    response: StimulationResponse,
    failed: &Mutex<Vec<StimulationResponse>>,
) {
    if response.error.is_some() {
        failed.lock().expect("status lock poisoned").push(response.clone());
    }

    let mut pending = Vec::new();
    for listener in listeners {
        match listener.on_response(&response) {
            ListenerOutcome::Ready(Ok(())) => {}
            ListenerOutcome::Ready(Err(message)) => {
                if first_listener_error.is_none() {
                    *first_listener_error = Some(message);
                }
            }
            ListenerOutcome::Pending(future) => pending.push(future),
        }
    }
    if !pending.is_empty() {
        listener_futures.push(Box::pin(futures::future::join_all(pending)));
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn run(
    status: Arc<StimulationStatus>,
    graph: Arc<GraphIndex>,
    ctx: ContextHandle,
    seed: Vec<AnySignal>,
    listeners: Vec<Arc<dyn ResponseListener>>,
    abort_signal: Option<AbortSignal>,
    max_neuron_hops: Option<u32>,
    allow_type: Option<AllowType>,
    global_concurrency: Option<NonZeroUsize>,
    neuron_semaphores: Vec<Option<Arc<Semaphore>>>,
    projection: ResponseProjection,
) -> Result<(), KernelError> {
    let global_semaphore = global_concurrency.map(|n| Arc::new(Semaphore::new(n.get())));

    let mut queue: VecDeque<ActivationTask> = VecDeque::new();
    let mut in_flight_futures: FuturesUnordered<BoxFuture<'static, Settled>> = FuturesUnordered::new();
    let mut listener_futures: ListenerFutures = FuturesUnordered::new();
    let mut first_listener_error: Option<String> = None;
    let mut cancelled = false;

    seed_activations(&graph, seed, &allow_type, &mut queue);
    status.queue_len.store(queue.len(), Ordering::Relaxed);

    loop {
        if abort_signal.as_ref().is_some_and(AbortSignal::is_tripped) {
            if !cancelled {
                debug!(stimulation_id = %status.id, "abort signal tripped, draining queue");
            }
            cancelled = true;
            while let Some(task) = queue.pop_front() {
                let hops = max_neuron_hops.map(|_| task.hop);
                let response = StimulationResponse::new(
                    status.id.clone(),
                    SignalView {
                        collateral_id: task.input.collateral_id.clone(),
                        payload_present: task.input.payload.is_some(),
                    },
                    None,
                    ctx.snapshot(),
                    queue.len(),
                    hops,
                    Some(ResponseError::new(ErrorKind::Cancelled, "stimulation cancelled")),
                    projection,
                );
                fan_out(&listeners, &mut listener_futures, &mut first_listener_error, response, &status.failed);
            }
            status.queue_len.store(0, Ordering::Relaxed);
        }

        while let Some(task) = queue.front() {
            // A synchronous self-loop never yields on its own; re-check here
            // so a trip during this burst is noticed before the next
            // dequeue instead of spinning until the queue empties.
            if abort_signal.as_ref().is_some_and(AbortSignal::is_tripped) {
                break;
            }
            if max_neuron_hops.is_some_and(|max| task.hop > max) {
                let task = queue.pop_front().expect("front just peeked");
                status.queue_len.store(queue.len(), Ordering::Relaxed);
                let response = StimulationResponse::new(
                    status.id.clone(),
                    SignalView {
                        collateral_id: task.input.collateral_id.clone(),
                        payload_present: task.input.payload.is_some(),
                    },
                    None,
                    ctx.snapshot(),
                    queue.len(),
                    Some(task.hop),
                    Some(ResponseError::new(ErrorKind::HopLimitExceeded, format!("hop {} exceeds bound", task.hop))),
                    projection,
                );
                fan_out(&listeners, &mut listener_futures, &mut first_listener_error, response, &status.failed);
                continue;
            }

            let neuron_idx = graph.dendrite(task.dendrite_idx).neuron_idx;

            let global_permit = match &global_semaphore {
                Some(sem) => match sem.clone().try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
                None => None,
            };
            let neuron_permit = match neuron_semaphores[neuron_idx].as_ref() {
                Some(sem) => match sem.clone().try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        drop(global_permit);
                        break;
                    }
                },
                None => None,
            };

            let task = queue.pop_front().expect("front just peeked");
            status.queue_len.store(queue.len(), Ordering::Relaxed);

            let dendrite = graph.dendrite(task.dendrite_idx);
            let neuron = graph.neuron(dendrite.neuron_idx);
            let outcome = dendrite.handler.respond(&task.input, &neuron.axon, ctx.clone());

            match outcome {
                // Synchronous fast path: resolve and fan out without ever
                // touching the concurrent dispatch set, so purely
                // synchronous graphs dispatch in strict enqueue order.
                DendriteOutcome::Ready(result) => {
                    drop(global_permit);
                    drop(neuron_permit);
                    let hops = max_neuron_hops.map(|_| task.hop);
                    let input_view = SignalView {
                        collateral_id: task.input.collateral_id.clone(),
                        payload_present: task.input.payload.is_some(),
                    };
                    let (output_view, error) = finalize_result(&task, result, cancelled, &graph, &allow_type, &mut queue);
                    status.queue_len.store(queue.len(), Ordering::Relaxed);
                    let response = StimulationResponse::new(
                        status.id.clone(),
                        input_view,
                        output_view,
                        ctx.snapshot(),
                        queue.len(),
                        hops,
                        error,
                        projection,
                    );
                    trace!(stimulation_id = %status.id, hop = task.hop, "dispatched activation");
                    fan_out(&listeners, &mut listener_futures, &mut first_listener_error, response, &status.failed);
                }
                DendriteOutcome::Pending(future) => {
                    let max_duration = neuron.max_duration;
                    status.in_flight.fetch_add(1, Ordering::Relaxed);
                    let status_for_task = status.clone();
                    in_flight_futures.push(Box::pin(async move {
                        let settlement = match max_duration {
                            Some(bound) => match tokio::time::timeout(bound, future).await {
                                Ok(result) => Settlement::Resolved(result),
                                Err(_) => Settlement::TimedOut,
                            },
                            None => Settlement::Resolved(future.await),
                        };
                        drop(global_permit);
                        drop(neuron_permit);
                        status_for_task.in_flight.fetch_sub(1, Ordering::Relaxed);
                        Settled { task, settlement }
                    }));
                }
            }
        }

        if queue.is_empty() && in_flight_futures.is_empty() && listener_futures.is_empty() {
            break;
        }

        // The inner dequeue loop above breaks as soon as it notices a trip,
        // which can leave tasks in the queue with nothing in-flight or
        // pending to wait on. Loop back to the top so the drain block runs
        // instead of reaching `select!` with every branch disabled.
        if abort_signal.as_ref().is_some_and(AbortSignal::is_tripped) && in_flight_futures.is_empty() && listener_futures.is_empty() {
            continue;
        }

        tokio::select! {
            Some(settled) = in_flight_futures.next(), if !in_flight_futures.is_empty() => {
                let Settled { task, settlement } = settled;
                let hops = max_neuron_hops.map(|_| task.hop);
                let input_view = SignalView {
                    collateral_id: task.input.collateral_id.clone(),
                    payload_present: task.input.payload.is_some(),
                };

                let (output_view, error) = match settlement {
                    Settlement::Resolved(result) => finalize_result(&task, result, cancelled, &graph, &allow_type, &mut queue),
                    Settlement::TimedOut => (None, Some(ResponseError::new(ErrorKind::Timeout, "dendrite exceeded its max duration"))),
                };

                status.queue_len.store(queue.len(), Ordering::Relaxed);
                let response = StimulationResponse::new(
                    status.id.clone(),
                    input_view,
                    output_view,
                    ctx.snapshot(),
                    queue.len(),
                    hops,
                    error,
                    projection,
                );
                trace!(stimulation_id = %status.id, hop = task.hop, "dispatched activation");
                fan_out(&listeners, &mut listener_futures, &mut first_listener_error, response, &status.failed);
            }
            Some(results) = listener_futures.next(), if !listener_futures.is_empty() => {
                for result in results {
                    if let Err(message) = result {
                        if first_listener_error.is_none() {
                            first_listener_error = Some(message);
                        }
                    }
                }
            }
        }
    }

    let terminal = if first_listener_error.is_some() {
        TerminalState::ListenerFailed
    } else if cancelled {
        TerminalState::Cancelled
    } else {
        TerminalState::Completed
    };
    *status.terminal.lock().expect("status lock poisoned") = Some(terminal);

    match first_listener_error {
        Some(message) => Err(KernelError::ListenerFailed(message)),
        None => Ok(()),
    }
}
