// SPDX-License-Identifier: PolyForm-Shield-1.0

//! The Graph Index: immutable lookup tables derived once from a neuron list
//! and shared read-only across every Stimulation built on top of it.
//!
//! Neurons and dendrites are addressed by integer indices into two arenas
//! rather than by pointer or reference, which makes self-stimulating
//! (cyclic) graphs trivial to represent and keeps the index `Send + Sync`
//! for sharing across concurrently-running Stimulations.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use cnstra_protocol::{Axon, CollateralId, DendriteHandler, NeuronDescriptor, NeuronId};

/// Errors produced while building a [`GraphIndex`]: duplicate neuron ids are
/// rejected, and each neuron's axon must be a mapping of distinct names to
/// distinct collaterals.
#[derive(Debug, Error)]
pub enum GraphBuildError {
    #[error("duplicate neuron id: {0}")]
    DuplicateNeuronId(NeuronId),
    #[error("neuron {neuron} has a malformed axon (duplicate output name or collateral)")]
    MalformedAxon { neuron: NeuronId },
}

/// One neuron as stored in the arena: its bound axon adapter and caps.
pub struct GraphNeuron {
    pub id: NeuronId,
    pub axon: Axon,
    pub concurrency: Option<NonZeroUsize>,
    pub max_duration: Option<Duration>,
}

/// One dendrite as stored in the arena, with its owning neuron's index
/// resolved so the dispatch loop never needs to look up a neuron by id on
/// the hot path.
pub struct GraphDendrite {
    pub neuron_idx: usize,
    pub input_collateral_id: CollateralId,
    pub handler: Arc<dyn DendriteHandler>,
}

/// Immutable lookup tables derived from a neuron list.
pub struct GraphIndex {
    neurons: Vec<GraphNeuron>,
    dendrites: Vec<GraphDendrite>,
    /// collateral id → dendrite indices, in stable insertion order: the
    /// order neurons were given to the kernel, then the order dendrites
    /// were declared within each neuron. The dispatch loop's determinism
    /// depends on this ordering.
    subscribers: HashMap<CollateralId, Vec<usize>>,
    neuron_index: HashMap<NeuronId, usize>,
}

impl GraphIndex {
    /// Build a `GraphIndex` from an ordered neuron list produced by the
    /// (external) authoring layer. Neurons and dendrites keep the order
    /// they're given in; that order is the contract determinism is built on.
    pub fn build(neurons: Vec<NeuronDescriptor>) -> Result<Self, GraphBuildError> {
        let mut arena_neurons = Vec::with_capacity(neurons.len());
        let mut arena_dendrites = Vec::new();
        let mut subscribers: HashMap<CollateralId, Vec<usize>> = HashMap::new();
        let mut neuron_index = HashMap::new();

        for neuron in neurons {
            if neuron_index.contains_key(&neuron.id) {
                return Err(GraphBuildError::DuplicateNeuronId(neuron.id));
            }
            if !neuron.axon.is_well_formed() {
                return Err(GraphBuildError::MalformedAxon { neuron: neuron.id });
            }

            let neuron_idx = arena_neurons.len();
            neuron_index.insert(neuron.id.clone(), neuron_idx);

            let axon = neuron.axon.bind(neuron.id.clone());
            arena_neurons.push(GraphNeuron {
                id: neuron.id,
                axon,
                concurrency: neuron.concurrency,
                max_duration: neuron.max_duration,
            });

            for dendrite in neuron.dendrites {
                let dendrite_idx = arena_dendrites.len();
                subscribers
                    .entry(dendrite.input_collateral_id.clone())
                    .or_default()
                    .push(dendrite_idx);
                arena_dendrites.push(GraphDendrite {
                    neuron_idx,
                    input_collateral_id: dendrite.input_collateral_id,
                    handler: dendrite.handler,
                });
            }
        }

        debug!(
            neurons = arena_neurons.len(),
            dendrites = arena_dendrites.len(),
            collaterals = subscribers.len(),
            "built graph index"
        );

        Ok(Self {
            neurons: arena_neurons,
            dendrites: arena_dendrites,
            subscribers,
            neuron_index,
        })
    }

    /// Dendrite indices subscribed to `collateral_id`, in stable insertion
    /// order. Empty slice if nobody subscribes — a signal on a collateral
    /// with no subscribers produces no response and no error.
    pub fn dendrites_for(&self, collateral_id: &CollateralId) -> &[usize] {
        self.subscribers
            .get(collateral_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dendrite(&self, idx: usize) -> &GraphDendrite {
        &self.dendrites[idx]
    }

    pub fn neuron(&self, idx: usize) -> &GraphNeuron {
        &self.neurons[idx]
    }

    pub fn neuron_index_of(&self, id: &NeuronId) -> Option<usize> {
        self.neuron_index.get(id).copied()
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    pub fn neuron_ids(&self) -> impl Iterator<Item = &NeuronId> {
        self.neurons.iter().map(|n| &n.id)
    }

    pub fn collateral_ids(&self) -> impl Iterator<Item = &CollateralId> {
        self.subscribers.keys()
    }

    /// `true` if no dendrite in the graph is subscribed to `collateral_id`
    /// (used to recognise "unknown collateral" vs. merely "unsubscribed").
    pub fn has_subscribers(&self, collateral_id: &CollateralId) -> bool {
        self.subscribers.contains_key(collateral_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnstra_protocol::{AxonDescriptor, DendriteDescriptor, DendriteOutcome};

    fn passthrough_dendrite(input: &str) -> DendriteDescriptor {
        DendriteDescriptor::new(input, |_input, _axon, _ctx| DendriteOutcome::empty())
    }

    #[test]
    fn rejects_duplicate_neuron_ids() {
        let neurons = vec![NeuronDescriptor::new("n1"), NeuronDescriptor::new("n1")];
        let err = GraphIndex::build(neurons).unwrap_err();
        assert!(matches!(err, GraphBuildError::DuplicateNeuronId(_)));
    }

    #[test]
    fn rejects_malformed_axon() {
        let axon = AxonDescriptor::new().with_output("a", "c1").with_output("b", "c1");
        let neurons = vec![NeuronDescriptor::new("n1").with_axon(axon)];
        let err = GraphIndex::build(neurons).unwrap_err();
        assert!(matches!(err, GraphBuildError::MalformedAxon { .. }));
    }

    #[test]
    fn dendrites_for_preserves_insertion_order() {
        let n1 = NeuronDescriptor::new("n1").with_dendrite(passthrough_dendrite("in"));
        let n2 = NeuronDescriptor::new("n2").with_dendrite(passthrough_dendrite("in"));
        let graph = GraphIndex::build(vec![n1, n2]).unwrap();

        let subs = graph.dendrites_for(&"in".into());
        assert_eq!(subs.len(), 2);
        assert_eq!(graph.dendrite(subs[0]).neuron_idx, graph.neuron_index_of(&"n1".into()).unwrap());
        assert_eq!(graph.dendrite(subs[1]).neuron_idx, graph.neuron_index_of(&"n2".into()).unwrap());
    }

    #[test]
    fn unsubscribed_collateral_has_no_dendrites() {
        let graph = GraphIndex::build(vec![NeuronDescriptor::new("n1")]).unwrap();
        assert!(graph.dendrites_for(&"nothing".into()).is_empty());
        assert!(!graph.has_subscribers(&"nothing".into()));
    }
}
