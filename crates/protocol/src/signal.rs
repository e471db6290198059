// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::ids::CollateralId;

/// opaque, type-erased payload carried on the queue.
///
/// the authoring layer is expected to enforce that a payload boxed here
/// always matches the static type `P` declared by the [`Collateral<P>`] it
/// was created from; the kernel itself never inspects or downcasts it
/// except when a dendrite handler chooses to (see [`AnySignal::downcast`]).
pub type Payload = Box<dyn Any + Send>;

/// a named, typed channel. `P` is a compile-time-only marker — at runtime,
/// identity is by [`CollateralId`] alone: authoring code identifies a
/// collateral by its Rust binding, the kernel identifies it only by id.
pub struct Collateral<P> {
    id: CollateralId,
    _marker: PhantomData<fn() -> P>,
}

impl<P> Clone for Collateral<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<P> fmt::Debug for Collateral<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collateral").field("id", &self.id).finish()
    }
}

impl<P: Send + 'static> Collateral<P> {
    pub fn new(id: impl Into<CollateralId>) -> Self {
        Self {
            id: id.into(),
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &CollateralId {
        &self.id
    }

    /// build a strongly typed signal addressed to this collateral.
    pub fn signal(&self, payload: P) -> Signal<P> {
        Signal {
            collateral_id: self.id.clone(),
            payload: Some(payload),
        }
    }

    /// build a strongly typed signal carrying no payload.
    pub fn void_signal(&self) -> Signal<P> {
        Signal {
            collateral_id: self.id.clone(),
            payload: None,
        }
    }
}

fn collateral_id(id: impl Into<CollateralId>) -> CollateralId {
    id.into()
}

impl<P> Collateral<P> {
    /// construct a collateral when `P` does not need to satisfy `Send + 'static`
    /// (e.g. for authoring-time descriptions that are never boxed into the queue).
    pub fn untyped(id: impl Into<CollateralId>) -> Self {
        Self {
            id: collateral_id(id),
            _marker: PhantomData,
        }
    }
}

/// a value to deliver on a specific collateral, still carrying its static type.
#[derive(Debug, Clone)]
pub struct Signal<P> {
    pub collateral_id: CollateralId,
    pub payload: Option<P>,
}

impl<P: Send + 'static> Signal<P> {
    /// erase this signal's payload type for the queue / dispatch loop.
    pub fn into_any(self) -> AnySignal {
        AnySignal {
            collateral_id: self.collateral_id,
            payload: self.payload.map(|p| Box::new(p) as Payload),
        }
    }
}

/// a type-erased signal as it travels through the activation queue.
///
/// the kernel is payload-type-agnostic: the authoring layer, which produced
/// the strongly typed [`Signal<P>`] in the first place, is the only party
/// that ever downcasts the payload back to a concrete type.
pub struct AnySignal {
    pub collateral_id: CollateralId,
    pub payload: Option<Payload>,
}

impl fmt::Debug for AnySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnySignal")
            .field("collateral_id", &self.collateral_id)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

impl AnySignal {
    pub fn new(collateral_id: CollateralId, payload: impl Any + Send + 'static) -> Self {
        Self {
            collateral_id,
            payload: Some(Box::new(payload)),
        }
    }

    pub fn void(collateral_id: CollateralId) -> Self {
        Self {
            collateral_id,
            payload: None,
        }
    }

    /// attempt to recover a concrete payload type. Returns `None` if there was
    /// no payload, or if the boxed payload is not of type `P`.
    pub fn downcast<P: 'static>(&self) -> Option<&P> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<P>())
    }
}
