// SPDX-License-Identifier: PolyForm-Shield-1.0

//! the stimulation runtime: a deterministic, bounded, concurrency-gated
//! traversal engine over a [`cnstra_graph::GraphIndex`].
//!
//! construct a [`Cns`] from an ordered neuron list, then call
//! [`Cns::stimulate`] to inject one or more seed signals and drive the graph
//! to quiescence.

mod activation;
mod cancellation;
mod kernel;
mod options;
mod response;
mod stimulation;

pub use activation::ActivationTask;
pub use cancellation::AbortSignal;
pub use kernel::{Cns, ListenerHandle};
pub use options::{AllowType, SeedSignals, StimulateOptions};
pub use response::{ListenerOutcome, ResponseError, ResponseListener, ResponseProjection, SignalView, StimulationResponse};
pub use stimulation::{Stimulation, TerminalState};
