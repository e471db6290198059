// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// stable, cross-tool error identifiers.
///
/// These are serialised verbatim onto [`crate::response::ResponseError`] so
/// that external collaborators (devtools, dashboards, the authoring layer)
/// can match on them without depending on this crate's Rust types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownCollateral,
    HopLimitExceeded,
    Timeout,
    Cancelled,
    DendriteFailed,
    ListenerFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::UnknownCollateral => "UnknownCollateral",
            ErrorKind::HopLimitExceeded => "HopLimitExceeded",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::DendriteFailed => "DendriteFailed",
            ErrorKind::ListenerFailed => "ListenerFailed",
        };
        f.write_str(s)
    }
}

/// errors a dendrite handler can produce while responding to a signal.
#[derive(Debug, Error)]
pub enum DendriteError {
    /// the handler itself threw, or its future resolved to an error.
    #[error("dendrite failed: {0}")]
    Failed(String),

    /// the handler tried to emit on an axon output name it doesn't own.
    /// compile-time-prevented for authoring code that only uses named
    /// constants, but guarded here too since `name` is a plain string.
    #[error("dendrite emitted on unknown axon output {name:?}")]
    UnknownAxonOutput { name: String },
}

impl DendriteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DendriteError::Failed(_) => ErrorKind::DendriteFailed,
            DendriteError::UnknownAxonOutput { .. } => ErrorKind::UnknownCollateral,
        }
    }
}

/// error surfaced by the top-level `stimulate` future.
///
/// User dendrite failures never appear here — only failures of the kernel's
/// own contract with the caller (a response listener erroring out).
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("response listener failed: {0}")]
    ListenerFailed(String),
}
