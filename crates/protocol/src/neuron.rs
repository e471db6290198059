// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::axon::AxonDescriptor;
use crate::dendrite::DendriteDescriptor;
use crate::ids::NeuronId;

/// a typed processing unit: an axon plus zero or more dendrites and
/// optional concurrency/duration caps.
pub struct NeuronDescriptor {
    pub id: NeuronId,
    pub axon: AxonDescriptor,
    pub dendrites: Vec<DendriteDescriptor>,
    /// per-neuron in-flight cap. `None` means unbounded.
    pub concurrency: Option<NonZeroUsize>,
    /// per-dispatch timeout. `None` means unbounded.
    pub max_duration: Option<Duration>,
}

impl NeuronDescriptor {
    pub fn new(id: impl Into<NeuronId>) -> Self {
        Self {
            id: id.into(),
            axon: AxonDescriptor::new(),
            dendrites: Vec::new(),
            concurrency: None,
            max_duration: None,
        }
    }

    pub fn with_axon(mut self, axon: AxonDescriptor) -> Self {
        self.axon = axon;
        self
    }

    pub fn with_dendrite(mut self, dendrite: DendriteDescriptor) -> Self {
        self.dendrites.push(dendrite);
        self
    }

    pub fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }
}
