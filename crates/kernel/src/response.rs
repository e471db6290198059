// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::sync::Arc;

use futures::future::BoxFuture;

use cnstra_protocol::{CollateralId, ErrorKind};

/// a lightweight, observable view of a signal.
///
/// `AnySignal`'s payload is `Box<dyn Any + Send>` with no `Clone` bound, and
/// the same owned signal is also the one forwarded to child dendrites, so a
/// response can't carry an actual copy of the payload without cloning it —
/// something this crate's type-erased contract can't require. A response
/// instead reports only whether a payload was present; `ResponseProjection`
/// decides whether even that much is reported.
#[derive(Debug, Clone)]
pub struct SignalView {
    pub collateral_id: CollateralId,
    pub payload_present: bool,
}

/// policy controlling whether a response's output payload presence flag is
/// always included or always omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseProjection {
    #[default]
    Full,
    OmitPayload,
}

impl ResponseProjection {
    fn project(self, view: SignalView) -> SignalView {
        match self {
            ResponseProjection::Full => view,
            ResponseProjection::OmitPayload => SignalView {
                payload_present: false,
                ..view
            },
        }
    }
}

/// structured error attached to a response.
#[derive(Debug, Clone)]
pub struct ResponseError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ResponseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// observable per-hop record, emitted exactly once per dispatched activation.
#[derive(Debug, Clone)]
pub struct StimulationResponse {
    pub stimulation_id: Arc<str>,
    pub input_signal: SignalView,
    pub output_signal: Option<SignalView>,
    pub context_value: serde_json::Value,
    pub queue_length: usize,
    pub hops: Option<u32>,
    pub error: Option<ResponseError>,
}

impl StimulationResponse {
    pub(crate) fn new(
        stimulation_id: Arc<str>,
        input_signal: SignalView,
        output_signal: Option<SignalView>,
        context_value: serde_json::Value,
        queue_length: usize,
        hops: Option<u32>,
        error: Option<ResponseError>,
        projection: ResponseProjection,
    ) -> Self {
        Self {
            stimulation_id,
            input_signal: projection.project(input_signal),
            output_signal: output_signal.map(|v| projection.project(v)),
            context_value,
            queue_length,
            hops,
            error,
        }
    }
}

/// sum type for a listener's result, mirroring `DendriteOutcome`'s
/// `Ready`/`Pending` split so synchronous listeners never force an await
/// point.
pub enum ListenerOutcome {
    Ready(Result<(), String>),
    Pending(BoxFuture<'static, Result<(), String>>),
}

impl ListenerOutcome {
    pub fn ok() -> Self {
        Self::Ready(Ok(()))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Ready(Err(message.into()))
    }
}

/// an observer invoked after every dispatched activation, local to a single
/// Stimulation (`onResponse`) or global to a CNS (`addResponseListener`).
pub trait ResponseListener: Send + Sync {
    fn on_response(&self, response: &StimulationResponse) -> ListenerOutcome;
}

impl<F> ResponseListener for F
where
    F: Fn(&StimulationResponse) -> ListenerOutcome + Send + Sync,
{
    fn on_response(&self, response: &StimulationResponse) -> ListenerOutcome {
        (self)(response)
    }
}
