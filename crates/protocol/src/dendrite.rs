// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::axon::Axon;
use crate::context::ContextHandle;
use crate::error::DendriteError;
use crate::ids::CollateralId;
use crate::signal::AnySignal;

pub type SignalBatch = Vec<AnySignal>;

/// sum type for a dendrite's result: `Ready` resolves immediately without
/// touching the concurrent dispatch set, `Pending` is awaited alongside
/// other in-flight dispatches.
pub enum DendriteOutcome {
    Ready(Result<SignalBatch, DendriteError>),
    Pending(BoxFuture<'static, Result<SignalBatch, DendriteError>>),
}

impl DendriteOutcome {
    pub fn ready_ok(signals: SignalBatch) -> Self {
        Self::Ready(Ok(signals))
    }

    pub fn one(signal: AnySignal) -> Self {
        Self::Ready(Ok(vec![signal]))
    }

    pub fn empty() -> Self {
        Self::Ready(Ok(Vec::new()))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Ready(Err(DendriteError::Failed(message.into())))
    }
}

/// a subscription binding a neuron to an input collateral plus a handler.
/// `respond` is expected to be a pure function of `(input, axon, ctx)`; the
/// kernel never calls it more than once per matched activation.
pub trait DendriteHandler: Send + Sync {
    fn respond(&self, input: &AnySignal, axon: &Axon, ctx: ContextHandle) -> DendriteOutcome;
}

impl<F> DendriteHandler for F
where
    F: Fn(&AnySignal, &Axon, ContextHandle) -> DendriteOutcome + Send + Sync,
{
    fn respond(&self, input: &AnySignal, axon: &Axon, ctx: ContextHandle) -> DendriteOutcome {
        (self)(input, axon, ctx)
    }
}

/// build-time description of one dendrite, immutable once the CNS is built.
pub struct DendriteDescriptor {
    pub input_collateral_id: CollateralId,
    pub handler: Arc<dyn DendriteHandler>,
}

impl DendriteDescriptor {
    pub fn new(input_collateral_id: impl Into<CollateralId>, handler: impl DendriteHandler + 'static) -> Self {
        Self {
            input_collateral_id: input_collateral_id.into(),
            handler: Arc::new(handler),
        }
    }
}
