// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::fmt;
use std::sync::Arc;

/// identifier of a [`crate::signal::Collateral`], stable for the lifetime of a CNS.
///
/// cheaply clonable (`Arc<str>` underneath) since the same id is copied into
/// every [`crate::dendrite::DendriteDescriptor`] that subscribes to it and
/// into every activation task and response built while dispatching a signal
/// addressed to it.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CollateralId(Arc<str>);

/// identifier of a [`crate::neuron::NeuronDescriptor`], stable for the lifetime of a CNS.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NeuronId(Arc<str>);

macro_rules! id_type {
    ($ty:ident) => {
        impl $ty {
            pub fn new(id: impl Into<Arc<str>>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($ty), self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::new(s))
            }
        }
    };
}

id_type!(CollateralId);
id_type!(NeuronId);
