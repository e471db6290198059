// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::sync::Arc;
use std::time::Instant;

use cnstra_protocol::AnySignal;

/// one pending dendrite invocation.
///
/// `input` is `Arc`-shared rather than owned: a single emitted signal fans
/// out to every subscriber dendrite of its collateral, and `AnySignal`'s
/// payload has no `Clone` bound, so sibling tasks share one allocation
/// instead of each cloning the payload.
pub struct ActivationTask {
    pub dendrite_idx: usize,
    pub input: Arc<AnySignal>,
    pub hop: u32,
    pub parent_hop: Option<u32>,
    pub enqueued_at: Instant,
}

impl ActivationTask {
    pub fn new(dendrite_idx: usize, input: Arc<AnySignal>, hop: u32, parent_hop: Option<u32>) -> Self {
        Self {
            dendrite_idx,
            input,
            hop,
            parent_hop,
            enqueued_at: Instant::now(),
        }
    }
}
