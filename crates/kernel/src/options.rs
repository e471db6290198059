// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::num::NonZeroUsize;
use std::sync::Arc;

use cnstra_protocol::{AnySignal, CollateralId, ContextHandle, ContextStoreFactory};

use crate::cancellation::AbortSignal;
use crate::response::{ResponseListener, ResponseProjection};

/// one or an ordered sequence of seed signals.
pub struct SeedSignals(pub(crate) Vec<AnySignal>);

impl From<AnySignal> for SeedSignals {
    fn from(signal: AnySignal) -> Self {
        Self(vec![signal])
    }
}

impl From<Vec<AnySignal>> for SeedSignals {
    fn from(signals: Vec<AnySignal>) -> Self {
        Self(signals)
    }
}

pub type AllowType = Arc<dyn Fn(&CollateralId) -> bool + Send + Sync>;

/// options accepted by `Cns::stimulate`. Every field is optional.
#[derive(Clone, Default)]
pub struct StimulateOptions {
    pub(crate) max_neuron_hops: Option<u32>,
    pub(crate) allow_type: Option<AllowType>,
    pub(crate) on_response: Option<Arc<dyn ResponseListener>>,
    pub(crate) abort_signal: Option<AbortSignal>,
    pub(crate) stimulation_id: Option<String>,
    pub(crate) context_store: Option<ContextHandle>,
    pub(crate) create_context_store: Option<ContextStoreFactory>,
    pub(crate) concurrency: Option<NonZeroUsize>,
    pub(crate) response_projection: ResponseProjection,
}

impl StimulateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_neuron_hops(mut self, hops: u32) -> Self {
        self.max_neuron_hops = Some(hops);
        self
    }

    pub fn with_allow_type(mut self, predicate: impl Fn(&CollateralId) -> bool + Send + Sync + 'static) -> Self {
        self.allow_type = Some(Arc::new(predicate));
        self
    }

    pub fn with_on_response(mut self, listener: impl ResponseListener + 'static) -> Self {
        self.on_response = Some(Arc::new(listener));
        self
    }

    pub fn with_abort_signal(mut self, abort_signal: AbortSignal) -> Self {
        self.abort_signal = Some(abort_signal);
        self
    }

    pub fn with_stimulation_id(mut self, id: impl Into<String>) -> Self {
        self.stimulation_id = Some(id.into());
        self
    }

    pub fn with_context_store(mut self, store: ContextHandle) -> Self {
        self.context_store = Some(store);
        self
    }

    pub fn with_create_context_store(mut self, factory: ContextStoreFactory) -> Self {
        self.create_context_store = Some(factory);
        self
    }

    pub fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_response_projection(mut self, projection: ResponseProjection) -> Self {
        self.response_projection = projection;
        self
    }
}
