// SPDX-License-Identifier: PolyForm-Shield-1.0

//! TOML-backed defaults for `cnstra-kernel`'s `StimulateOptions`: default
//! concurrency, default hop bound, and the output-payload projection policy.

use std::num::NonZeroUsize;

use anyhow::{Context, Result};
use cnstra_kernel::{ResponseProjection, StimulateOptions};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CnstraDefaults {
    pub concurrency: Option<NonZeroUsize>,
    pub max_neuron_hops: Option<u32>,
    pub include_output_payload: Option<bool>,
}

impl CnstraDefaults {
    pub fn response_projection(&self) -> ResponseProjection {
        match self.include_output_payload {
            Some(false) => ResponseProjection::OmitPayload,
            _ => ResponseProjection::Full,
        }
    }

    /// A `StimulateOptions` seeded with these defaults. Chain further
    /// `with_*` calls on the result to override any of them per call.
    pub fn stimulate_options(&self) -> StimulateOptions {
        let mut options = StimulateOptions::new().with_response_projection(self.response_projection());
        if let Some(concurrency) = self.concurrency {
            options = options.with_concurrency(concurrency);
        }
        if let Some(hops) = self.max_neuron_hops {
            options = options.with_max_neuron_hops(hops);
        }
        options
    }
}

pub fn load_from_file(path: &str) -> Result<CnstraDefaults> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
    toml::from_str(&raw).with_context(|| format!("parsing config file {path} as TOML"))
}
