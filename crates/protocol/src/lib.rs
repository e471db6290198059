// SPDX-License-Identifier: PolyForm-Shield-1.0

//! data model shared between the authoring layer and the stimulation
//! runtime: collaterals, signals, dendrites, neurons, the axon adapter, the
//! context store contract, and the stable error-kind vocabulary.
//!
//! this crate knows nothing about traversal order, concurrency, or
//! dispatch — that belongs to `cnstra-graph` and `cnstra-kernel`. It only
//! defines the immutable shapes those crates operate on.

pub mod axon;
pub mod context;
pub mod dendrite;
pub mod error;
pub mod ids;
pub mod neuron;
pub mod signal;

pub use axon::{Axon, AxonDescriptor};
pub use context::{ContextHandle, ContextStore, ContextStoreFactory, MapContextStore};
pub use dendrite::{DendriteDescriptor, DendriteHandler, DendriteOutcome, SignalBatch};
pub use error::{DendriteError, ErrorKind, KernelError};
pub use ids::{CollateralId, NeuronId};
pub use neuron::NeuronDescriptor;
pub use signal::{AnySignal, Collateral, Payload, Signal};
