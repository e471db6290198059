// SPDX-License-Identifier: PolyForm-Shield-1.0

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cnstra_kernel::{Cns, ResponseListener, ListenerOutcome, StimulationResponse};
use cnstra_protocol::{AnySignal, AxonDescriptor, DendriteDescriptor, DendriteOutcome, NeuronDescriptor};

#[derive(Parser)]
#[command(name = "cnstra", version, about = "stimulate a demo graph and print the response stream")]
struct Cli {
    /// optional path to a TOML config file supplying stimulate defaults
    #[arg(long)]
    config: Option<String>,

    /// message to seed the demo graph with
    #[arg(long, default_value = "hello from the command line")]
    message: String,

    /// cap on neuron hops for this run (overrides the config file)
    #[arg(long)]
    max_neuron_hops: Option<u32>,

    /// cap on concurrent dispatches for this run (overrides the config file)
    #[arg(long)]
    concurrency: Option<std::num::NonZeroUsize>,
}

struct PrintListener;

impl ResponseListener for PrintListener {
    fn on_response(&self, response: &StimulationResponse) -> ListenerOutcome {
        match &response.error {
            Some(error) => println!(
                "[{}] {} -> error: {} ({})",
                response.stimulation_id, response.input_signal.collateral_id, error.kind, error.message
            ),
            None => println!(
                "[{}] {} -> {}",
                response.stimulation_id,
                response.input_signal.collateral_id,
                response
                    .output_signal
                    .as_ref()
                    .map(|view| view.collateral_id.to_string())
                    .unwrap_or_else(|| "(no output)".to_string()),
            ),
        }
        ListenerOutcome::ok()
    }
}

/// A three-neuron pipeline: `intake` uppercases the seed message, `shout`
/// appends an exclamation mark, `sink` just observes. Demonstrates a linear
/// synchronous fan-out through the stimulation runtime.
fn demo_graph() -> Vec<NeuronDescriptor> {
    let intake = NeuronDescriptor::new("intake")
        .with_axon(AxonDescriptor::new().with_output("uppercased", "pipeline.uppercased"))
        .with_dendrite(DendriteDescriptor::new("pipeline.seed", |input, axon, _ctx| {
            let text = input.downcast::<String>().cloned().unwrap_or_default();
            DendriteOutcome::Ready(axon.emit("uppercased", text.to_uppercase()).map(|s| vec![s]))
        }));

    let shout = NeuronDescriptor::new("shout")
        .with_axon(AxonDescriptor::new().with_output("shouted", "pipeline.shouted"))
        .with_dendrite(DendriteDescriptor::new("pipeline.uppercased", |input, axon, _ctx| {
            let text = input.downcast::<String>().cloned().unwrap_or_default();
            DendriteOutcome::Ready(axon.emit("shouted", format!("{text}!")).map(|s| vec![s]))
        }));

    let sink = NeuronDescriptor::new("sink").with_dendrite(DendriteDescriptor::new("pipeline.shouted", |_input, _axon, _ctx| {
        DendriteOutcome::empty()
    }));

    vec![intake, shout, sink]
}

#[tokio::main]
async fn main() -> Result<()> {
    cnstra_util::logging::init_tracing();

    let cli = Cli::parse();
    info!(message = %cli.message, "starting cnstra demo run");

    let defaults = match &cli.config {
        Some(path) => cnstra_config::load_from_file(path)?,
        None => cnstra_config::CnstraDefaults::default(),
    };

    let mut options = defaults.stimulate_options().with_on_response(PrintListener);
    if let Some(hops) = cli.max_neuron_hops {
        options = options.with_max_neuron_hops(hops);
    }
    if let Some(concurrency) = cli.concurrency {
        options = options.with_concurrency(concurrency);
    }

    let cns = Cns::new(demo_graph())?;
    let seed = AnySignal::new("pipeline.seed".into(), cli.message);
    cns.stimulate(seed, options).await?;

    Ok(())
}
