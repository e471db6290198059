// SPDX-License-Identifier: PolyForm-Shield-1.0

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global `tracing` subscriber: `RUST_LOG`-driven filtering,
/// defaulting to `info` when unset.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
