// SPDX-License-Identifier: PolyForm-Shield-1.0

//! The public surface: construct a CNS from a neuron list, `stimulate` it,
//! and register process-wide response listeners.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use cnstra_graph::{GraphBuildError, GraphIndex};
use cnstra_protocol::{CollateralId, ContextHandle, ContextStoreFactory, MapContextStore, NeuronDescriptor, NeuronId};
use tokio::sync::Semaphore;

use crate::options::{SeedSignals, StimulateOptions};
use crate::response::ResponseListener;
use crate::stimulation::{run, Stimulation, StimulationStatus};

/// a registered global listener. `unsubscribe` is idempotent: calling it
/// more than once, or after the CNS has already dropped the entry, is a
/// no-op.
pub struct ListenerHandle {
    id: u64,
    listeners: Arc<RwLock<Vec<(u64, Arc<dyn ResponseListener>)>>>,
}

impl ListenerHandle {
    pub fn unsubscribe(&self) {
        self.listeners
            .write()
            .expect("listener registry lock poisoned")
            .retain(|(id, _)| *id != self.id);
    }
}

/// the stimulation runtime's public entry point: an immutable graph plus a
/// process-wide (CNS-scoped) listener registry and stimulation id counter.
pub struct Cns {
    graph: Arc<GraphIndex>,
    context_factory: ContextStoreFactory,
    listeners: Arc<RwLock<Vec<(u64, Arc<dyn ResponseListener>)>>>,
    next_listener_id: AtomicU64,
    next_stimulation_id: AtomicU64,
}

impl Cns {
    /// builds the Graph Index from `neurons` and uses the default in-memory
    /// JSON context store unless overridden per-call via
    /// [`StimulateOptions::with_context_store`] / `with_create_context_store`.
    pub fn new(neurons: Vec<NeuronDescriptor>) -> Result<Self, GraphBuildError> {
        Self::with_context_store_factory(neurons, MapContextStore::factory())
    }

    pub fn with_context_store_factory(
        neurons: Vec<NeuronDescriptor>,
        context_factory: ContextStoreFactory,
    ) -> Result<Self, GraphBuildError> {
        let graph = GraphIndex::build(neurons)?;
        Ok(Self {
            graph: Arc::new(graph),
            context_factory,
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
            next_stimulation_id: AtomicU64::new(0),
        })
    }

    /// the default factory used when `stimulate` is called without an
    /// explicit context store.
    pub fn context_store_factory(&self) -> ContextStoreFactory {
        self.context_factory.clone()
    }

    pub fn neuron_ids(&self) -> impl Iterator<Item = &NeuronId> {
        self.graph.neuron_ids()
    }

    pub fn collateral_ids(&self) -> impl Iterator<Item = &CollateralId> {
        self.graph.collateral_ids()
    }

    /// registers a listener invoked for every response of every stimulation
    /// from now on, in registration order.
    pub fn add_response_listener(&self, listener: impl ResponseListener + 'static) -> ListenerHandle {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .expect("listener registry lock poisoned")
            .push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            listeners: self.listeners.clone(),
        }
    }

    /// starts a Stimulation for `seed`. The returned [`Stimulation`] is both
    /// the completion future and the synchronous inspection handle.
    pub fn stimulate(&self, seed: impl Into<SeedSignals>, options: StimulateOptions) -> Stimulation {
        let stimulation_id: Arc<str> = options
            .stimulation_id
            .clone()
            .unwrap_or_else(|| format!("stim-{}", self.next_stimulation_id.fetch_add(1, Ordering::Relaxed)))
            .into();

        let ctx: ContextHandle = match (&options.context_store, &options.create_context_store) {
            (Some(store), _) => store.clone(),
            (None, Some(factory)) => factory(),
            (None, None) => (self.context_factory)(),
        };

        let mut global_listeners: Vec<Arc<dyn ResponseListener>> = Vec::new();
        if let Some(on_response) = options.on_response.clone() {
            global_listeners.push(on_response);
        }
        global_listeners.extend(
            self.listeners
                .read()
                .expect("listener registry lock poisoned")
                .iter()
                .map(|(_, listener)| listener.clone()),
        );

        let neuron_semaphores: Vec<Option<Arc<Semaphore>>> = (0..self.graph.neuron_count())
            .map(|idx| self.graph.neuron(idx).concurrency.map(|cap| Arc::new(Semaphore::new(cap.get()))))
            .collect();

        let status = StimulationStatus::new(stimulation_id);
        let seed: SeedSignals = seed.into();

        let inner = Box::pin(run(
            status.clone(),
            self.graph.clone(),
            ctx,
            seed.0,
            global_listeners,
            options.abort_signal.clone(),
            options.max_neuron_hops,
            options.allow_type.clone(),
            options.concurrency,
            neuron_semaphores,
            options.response_projection,
        ));

        Stimulation::new(status, inner)
    }
}
