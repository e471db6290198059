// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::any::Any;

use crate::error::DendriteError;
use crate::ids::{CollateralId, NeuronId};
use crate::signal::AnySignal;

/// build-time description of a neuron's axon: a mapping of distinct output
/// names to distinct collaterals.
#[derive(Debug, Clone, Default)]
pub struct AxonDescriptor {
    outputs: Vec<(Box<str>, CollateralId)>,
}

impl AxonDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, name: impl Into<Box<str>>, collateral_id: impl Into<CollateralId>) -> Self {
        self.outputs.push((name.into(), collateral_id.into()));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|(n, _)| n.as_ref())
    }

    pub fn collateral_ids(&self) -> impl Iterator<Item = &CollateralId> {
        self.outputs.iter().map(|(_, c)| c)
    }

    /// `true` iff every declared name is unique and every declared collateral
    /// is unique, i.e. the axon is a proper mapping.
    pub fn is_well_formed(&self) -> bool {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        let unique_names = names.windows(2).all(|w| w[0] != w[1]);

        let mut ids: Vec<&CollateralId> = self.collateral_ids().collect();
        ids.sort();
        let unique_ids = ids.windows(2).all(|w| w[0] != w[1]);

        unique_names && unique_ids
    }

    pub(crate) fn bind(&self, owner: NeuronId) -> Axon {
        Axon {
            owner,
            outputs: self.outputs.clone(),
        }
    }
}

/// runtime adapter handed to a dendrite's handler so it can only synthesise
/// signals for collaterals its owning neuron actually declares.
pub struct Axon {
    owner: NeuronId,
    outputs: Vec<(Box<str>, CollateralId)>,
}

impl Axon {
    pub fn owner(&self) -> &NeuronId {
        &self.owner
    }

    /// emit a payload-carrying signal on the named output.
    ///
    /// returns [`DendriteError::UnknownAxonOutput`] if `name` is not one of
    /// this axon's declared outputs.
    pub fn emit(&self, name: &str, payload: impl Any + Send + 'static) -> Result<AnySignal, DendriteError> {
        self.resolve(name).map(|cid| AnySignal::new(cid.clone(), payload))
    }

    /// emit a signal with no payload on the named output.
    pub fn emit_void(&self, name: &str) -> Result<AnySignal, DendriteError> {
        self.resolve(name).map(|cid| AnySignal::void(cid.clone()))
    }

    fn resolve(&self, name: &str) -> Result<&CollateralId, DendriteError> {
        self.outputs
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, c)| c)
            .ok_or_else(|| DendriteError::UnknownAxonOutput {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_output() {
        let axon = AxonDescriptor::new()
            .with_output("a", "collateral.a")
            .bind(NeuronId::new("n"));
        let err = axon.emit("b", 1i32).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnknownCollateral);
    }

    #[test]
    fn emits_on_known_output() {
        let axon = AxonDescriptor::new()
            .with_output("a", "collateral.a")
            .bind(NeuronId::new("n"));
        let signal = axon.emit("a", 7i32).unwrap();
        assert_eq!(signal.collateral_id.as_str(), "collateral.a");
        assert_eq!(signal.downcast::<i32>(), Some(&7));
    }

    #[test]
    fn well_formed_detects_duplicate_names() {
        let axon = AxonDescriptor::new()
            .with_output("a", "c1")
            .with_output("a", "c2");
        assert!(!axon.is_well_formed());
    }

    #[test]
    fn well_formed_detects_duplicate_collaterals() {
        let axon = AxonDescriptor::new()
            .with_output("a", "c1")
            .with_output("b", "c1");
        assert!(!axon.is_well_formed());
    }
}
