// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cnstra_kernel::{AbortSignal, Cns, ListenerOutcome, ResponseListener, StimulateOptions, StimulationResponse};
use cnstra_protocol::{AnySignal, Axon, AxonDescriptor, CollateralId, DendriteDescriptor, DendriteOutcome, NeuronDescriptor, SignalBatch};

fn void(collateral: &str) -> AnySignal {
    AnySignal::void(CollateralId::from(collateral))
}

fn forward(output_name: &'static str) -> impl Fn(&AnySignal, &Axon, cnstra_protocol::ContextHandle) -> DendriteOutcome {
    move |_input, axon, _ctx| DendriteOutcome::Ready(axon.emit_void(output_name).map(|s| vec![s]))
}

/// Collects every response handed to it, in the order it receives them.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<StimulationResponse>>>);

impl Recorder {
    fn snapshot(&self) -> Vec<StimulationResponse> {
        self.0.lock().unwrap().clone()
    }

    fn collaterals(&self) -> Vec<String> {
        self.snapshot().iter().map(|r| r.input_signal.collateral_id.as_str().to_string()).collect()
    }
}

impl ResponseListener for Recorder {
    fn on_response(&self, response: &StimulationResponse) -> ListenerOutcome {
        self.0.lock().unwrap().push(response.clone());
        ListenerOutcome::ok()
    }
}

#[tokio::test]
async fn s1_fan_out_ordering() {
    let fan_out_handler = |_input: &AnySignal, axon: &Axon, _ctx: cnstra_protocol::ContextHandle| -> DendriteOutcome {
        let batch = (|| -> Result<SignalBatch, cnstra_protocol::DendriteError> {
            Ok(vec![axon.emit("A", 1i32)?, axon.emit("B", 2i32)?, axon.emit("C", 3i32)?])
        })();
        DendriteOutcome::Ready(batch)
    };

    let o = NeuronDescriptor::new("O")
        .with_axon(
            AxonDescriptor::new()
                .with_output("A", "out.a")
                .with_output("B", "out.b")
                .with_output("C", "out.c"),
        )
        .with_dendrite(DendriteDescriptor::new("in", fan_out_handler));
    let na = NeuronDescriptor::new("NA").with_dendrite(DendriteDescriptor::new("out.a", |_, _, _| DendriteOutcome::empty()));
    let nb = NeuronDescriptor::new("NB").with_dendrite(DendriteDescriptor::new("out.b", |_, _, _| DendriteOutcome::empty()));
    let nc = NeuronDescriptor::new("NC").with_dendrite(DendriteDescriptor::new("out.c", |_, _, _| DendriteOutcome::empty()));

    let cns = Cns::new(vec![o, na, nb, nc]).unwrap();
    let recorder = Recorder::default();
    let stim = cns.stimulate(void("in"), StimulateOptions::new().with_on_response(recorder.clone()));
    stim.await.unwrap();

    assert_eq!(recorder.collaterals(), vec!["in", "out.a", "out.b", "out.c"]);
    let after_o = &recorder.snapshot()[0];
    assert_eq!(after_o.queue_length, 3);
}

#[tokio::test]
async fn s2_hop_bound() {
    let n1 = NeuronDescriptor::new("N1")
        .with_axon(AxonDescriptor::new().with_output("fwd", "c.n2"))
        .with_dendrite(DendriteDescriptor::new("seed", forward("fwd")));
    let n2 = NeuronDescriptor::new("N2")
        .with_axon(AxonDescriptor::new().with_output("fwd", "c.n3"))
        .with_dendrite(DendriteDescriptor::new("c.n2", forward("fwd")));
    let n3 = NeuronDescriptor::new("N3")
        .with_axon(AxonDescriptor::new().with_output("fwd", "c.n4"))
        .with_dendrite(DendriteDescriptor::new("c.n3", forward("fwd")));
    let n4 = NeuronDescriptor::new("N4").with_dendrite(DendriteDescriptor::new("c.n4", |_, _, _| DendriteOutcome::empty()));

    let cns = Cns::new(vec![n1, n2, n3, n4]).unwrap();
    let recorder = Recorder::default();
    let stim = cns.stimulate(
        void("seed"),
        StimulateOptions::new().with_on_response(recorder.clone()).with_max_neuron_hops(2),
    );
    stim.await.unwrap();

    let responses = recorder.snapshot();
    assert_eq!(responses.len(), 4);
    assert_eq!(recorder.collaterals()[..3], ["seed", "c.n2", "c.n3"].map(str::to_string));
    assert!(responses[..3].iter().all(|r| r.error.is_none()));
    assert_eq!(responses[3].hops, Some(3));
    assert_eq!(responses[3].error.as_ref().unwrap().kind, cnstra_protocol::ErrorKind::HopLimitExceeded);
}

#[tokio::test(flavor = "multi_thread")]
async fn s3_per_neuron_concurrency() {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (current_for_handler, peak_for_handler) = (current.clone(), peak.clone());

    let handler = move |_input: &AnySignal, _axon: &Axon, _ctx: cnstra_protocol::ContextHandle| -> DendriteOutcome {
        let current = current_for_handler.clone();
        let peak = peak_for_handler.clone();
        DendriteOutcome::Pending(Box::pin(async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }))
    };

    let w = NeuronDescriptor::new("W")
        .with_concurrency(NonZeroUsize::new(2).unwrap())
        .with_dendrite(DendriteDescriptor::new("job", handler));
    let cns = Cns::new(vec![w]).unwrap();
    let recorder = Recorder::default();

    let seeds: Vec<AnySignal> = (0..5).map(|_| void("job")).collect();
    let started = Instant::now();
    let stim = cns.stimulate(seeds, StimulateOptions::new().with_on_response(recorder.clone()));
    stim.await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(recorder.snapshot().len(), 5);
    assert!(recorder.snapshot().iter().all(|r| r.error.is_none()));
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(elapsed >= Duration::from_millis(140), "elapsed was {elapsed:?}");
}

#[tokio::test]
async fn s4_dendrite_failure_isolation() {
    let a = NeuronDescriptor::new("A")
        .with_axon(AxonDescriptor::new().with_output("fwd", "b.in"))
        .with_dendrite(DendriteDescriptor::new("seed", forward("fwd")));
    let b = NeuronDescriptor::new("B").with_dendrite(DendriteDescriptor::new("b.in", |_, _, _| DendriteOutcome::failed("boom")));

    let cns = Cns::new(vec![a, b]).unwrap();
    let recorder = Recorder::default();
    let stim = cns.stimulate(void("seed"), StimulateOptions::new().with_on_response(recorder.clone()));
    let result = stim.await;

    assert!(result.is_ok());
    let responses = recorder.snapshot();
    assert_eq!(responses.len(), 2);
    assert!(responses[0].error.is_none());
    let b_error = responses[1].error.as_ref().unwrap();
    assert_eq!(b_error.kind, cnstra_protocol::ErrorKind::DendriteFailed);
}

#[tokio::test]
async fn s5_cancellation_mid_run() {
    let l = NeuronDescriptor::new("L")
        .with_axon(AxonDescriptor::new().with_output("again", "tick"))
        .with_dendrite(DendriteDescriptor::new("tick", forward("again")));
    let cns = Cns::new(vec![l]).unwrap();

    let abort = AbortSignal::new();
    let seen = Arc::new(AtomicUsize::new(0));

    struct TripAt10 {
        seen: Arc<AtomicUsize>,
        abort: AbortSignal,
    }
    impl ResponseListener for TripAt10 {
        fn on_response(&self, _response: &StimulationResponse) -> ListenerOutcome {
            let count = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
            if count == 10 {
                self.abort.trip();
            }
            ListenerOutcome::ok()
        }
    }

    let recorder = Recorder::default();
    cns.add_response_listener(recorder.clone());
    let stim = cns.stimulate(
        void("tick"),
        StimulateOptions::new()
            .with_abort_signal(abort.clone())
            .with_on_response(TripAt10 { seen: seen.clone(), abort: abort.clone() }),
    );
    stim.await.unwrap();

    let responses = recorder.snapshot();
    assert!(responses.len() >= 10);
    assert_eq!(responses.iter().filter(|r| r.error.is_none()).count(), 10);
    assert!(responses.iter().skip(10).all(|r| r.error.as_ref().unwrap().kind == cnstra_protocol::ErrorKind::Cancelled));
}

#[tokio::test]
async fn s6_deterministic_replay() {
    fn build() -> Cns {
        let fan_out_handler = |_input: &AnySignal, axon: &Axon, _ctx: cnstra_protocol::ContextHandle| -> DendriteOutcome {
            let batch = (|| -> Result<SignalBatch, cnstra_protocol::DendriteError> { Ok(vec![axon.emit("A", 1i32)?, axon.emit("B", 2i32)?]) })();
            DendriteOutcome::Ready(batch)
        };
        let o = NeuronDescriptor::new("O")
            .with_axon(AxonDescriptor::new().with_output("A", "out.a").with_output("B", "out.b"))
            .with_dendrite(DendriteDescriptor::new("in", fan_out_handler));
        let na = NeuronDescriptor::new("NA").with_dendrite(DendriteDescriptor::new("out.a", |_, _, _| DendriteOutcome::empty()));
        let nb = NeuronDescriptor::new("NB").with_dendrite(DendriteDescriptor::new("out.b", |_, _, _| DendriteOutcome::empty()));
        Cns::new(vec![o, na, nb]).unwrap()
    }

    async fn run_once() -> Vec<(String, usize, bool)> {
        let cns = build();
        let recorder = Recorder::default();
        let stim = cns.stimulate(void("in"), StimulateOptions::new().with_on_response(recorder.clone()));
        stim.await.unwrap();
        recorder
            .snapshot()
            .iter()
            .map(|r| (r.input_signal.collateral_id.as_str().to_string(), r.queue_length, r.error.is_some()))
            .collect()
    }

    let first = run_once().await;
    let second = run_once().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn boundary_empty_seed_resolves_immediately_with_no_responses() {
    let cns = Cns::new(vec![NeuronDescriptor::new("lonely")]).unwrap();
    let recorder = Recorder::default();
    let stim = cns.stimulate(Vec::<AnySignal>::new(), StimulateOptions::new().with_on_response(recorder.clone()));
    stim.await.unwrap();
    assert!(recorder.snapshot().is_empty());
}

#[tokio::test]
async fn boundary_unsubscribed_collateral_produces_no_response_and_no_error() {
    let cns = Cns::new(vec![NeuronDescriptor::new("lonely")]).unwrap();
    let recorder = Recorder::default();
    let stim = cns.stimulate(void("nobody-listens"), StimulateOptions::new().with_on_response(recorder.clone()));
    stim.await.unwrap();
    assert!(recorder.snapshot().is_empty());
}

#[tokio::test]
async fn boundary_max_neuron_hops_zero_runs_only_seed_activations() {
    let n0 = NeuronDescriptor::new("N0")
        .with_axon(AxonDescriptor::new().with_output("fwd", "next"))
        .with_dendrite(DendriteDescriptor::new("seed", forward("fwd")));
    let n1 = NeuronDescriptor::new("N1").with_dendrite(DendriteDescriptor::new("next", |_, _, _| DendriteOutcome::empty()));
    let cns = Cns::new(vec![n0, n1]).unwrap();
    let recorder = Recorder::default();
    let stim = cns.stimulate(
        void("seed"),
        StimulateOptions::new().with_on_response(recorder.clone()).with_max_neuron_hops(0),
    );
    stim.await.unwrap();

    let responses = recorder.snapshot();
    assert_eq!(responses.len(), 2);
    assert!(responses[0].error.is_none());
    assert_eq!(responses[1].error.as_ref().unwrap().kind, cnstra_protocol::ErrorKind::HopLimitExceeded);
}

#[tokio::test(flavor = "multi_thread")]
async fn boundary_global_concurrency_one_serializes_dispatches() {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (current_for_handler, peak_for_handler) = (current.clone(), peak.clone());

    let handler = move |_input: &AnySignal, _axon: &Axon, _ctx: cnstra_protocol::ContextHandle| -> DendriteOutcome {
        let current = current_for_handler.clone();
        let peak = peak_for_handler.clone();
        DendriteOutcome::Pending(Box::pin(async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }))
    };

    let w = NeuronDescriptor::new("W").with_dendrite(DendriteDescriptor::new("job", handler));
    let cns = Cns::new(vec![w]).unwrap();
    let recorder = Recorder::default();
    let seeds: Vec<AnySignal> = (0..3).map(|_| void("job")).collect();
    let stim = cns.stimulate(
        seeds,
        StimulateOptions::new()
            .with_on_response(recorder.clone())
            .with_concurrency(NonZeroUsize::new(1).unwrap()),
    );
    stim.await.unwrap();

    assert_eq!(recorder.snapshot().len(), 3);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invariant_every_response_reaches_every_registered_listener() {
    let o = NeuronDescriptor::new("O").with_dendrite(DendriteDescriptor::new("seed", |_, _, _| DendriteOutcome::empty()));
    let cns = Cns::new(vec![o]).unwrap();

    let local = Recorder::default();
    let global_a = Recorder::default();
    let global_b = Recorder::default();
    cns.add_response_listener(global_a.clone());
    cns.add_response_listener(global_b.clone());

    let stim = cns.stimulate(void("seed"), StimulateOptions::new().with_on_response(local.clone()));
    stim.await.unwrap();

    assert_eq!(local.snapshot().len(), 1);
    assert_eq!(global_a.snapshot().len(), 1);
    assert_eq!(global_b.snapshot().len(), 1);
}

#[tokio::test]
async fn listener_unsubscribe_is_idempotent_and_stops_delivery() {
    let o = NeuronDescriptor::new("O").with_dendrite(DendriteDescriptor::new("seed", |_, _, _| DendriteOutcome::empty()));
    let cns = Cns::new(vec![o]).unwrap();

    let recorder = Recorder::default();
    let handle = cns.add_response_listener(recorder.clone());
    handle.unsubscribe();
    handle.unsubscribe();

    let stim = cns.stimulate(void("seed"), StimulateOptions::new());
    stim.await.unwrap();
    assert!(recorder.snapshot().is_empty());
}

#[tokio::test]
async fn listener_failure_rejects_the_top_level_future() {
    struct AlwaysFails;
    impl ResponseListener for AlwaysFails {
        fn on_response(&self, _response: &StimulationResponse) -> ListenerOutcome {
            ListenerOutcome::failed("listener exploded")
        }
    }

    let o = NeuronDescriptor::new("O").with_dendrite(DendriteDescriptor::new("seed", |_, _, _| DendriteOutcome::empty()));
    let cns = Cns::new(vec![o]).unwrap();
    let stim = cns.stimulate(void("seed"), StimulateOptions::new().with_on_response(AlwaysFails));
    let result = stim.await;
    assert!(result.is_err());
}
