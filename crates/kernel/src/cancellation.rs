// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// cooperative cancellation handle: a one-shot flag plus a broadcast signal.
///
/// tripping is a one-way operation: once tripped, a signal stays tripped for
/// the lifetime of the handle. Dendrites observe it only if they choose to,
/// via the context handle or by holding their own clone.
#[derive(Clone, Default)]
pub struct AbortSignal {
    tripped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// resolves once this signal is tripped. A no-op poll if already tripped.
    pub async fn cancelled(&self) {
        if self.is_tripped() {
            return;
        }
        // `notified()` must be constructed before the recheck below to avoid
        // missing a `trip()` that happens in between.
        let notified = self.notify.notified();
        if self.is_tripped() {
            return;
        }
        notified.await;
    }
}
