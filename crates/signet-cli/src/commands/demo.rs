//! Scripted reconciler session.
//!
//! Renders an enveloped stereo tone with a gain ref, nudges the ref a few
//! times, swaps the carrier so the old voice becomes unreachable, then steps
//! the collector until the old voice is deleted. Every batch is printed.

use clap::Args;
use signet_config::{OutputFormat, RendererConfig};
use signet_core::{Node, RefMap, Renderer, Transport, ops, props};

use super::common::BatchPrinter;

/// Run a scripted render / ref update / GC session.
#[derive(Args)]
pub struct DemoArgs {
    /// Carrier frequency in Hz
    #[arg(long, default_value = "440.0")]
    pub freq: f64,

    /// Frequency of the replacement carrier rendered after the ref updates
    #[arg(long, default_value = "660.0")]
    pub swap_freq: f64,

    /// Number of gain ref updates
    #[arg(long, default_value = "3")]
    pub updates: usize,

    /// Print indented JSON
    #[arg(long)]
    pub pretty: bool,
}

/// Enveloped tone: `adsr * cycle(5) * cycle(freq) * gain`.
fn voice(freq: f64, gain: &Node) -> Node {
    let env = ops::mul(ops::adsr(0.01, 1.0, 0.0, 0.0, 1.00111902), ops::cycle(5.0));
    ops::mul(gain, ops::mul(env, ops::cycle(freq)))
}

/// Run the demo command.
pub fn run(args: DemoArgs, config: &RendererConfig) -> anyhow::Result<()> {
    let format = if args.pretty {
        OutputFormat::Pretty
    } else {
        config.output
    };
    let mut renderer = Renderer::with_terminal_generation(
        BatchPrinter::stdout(format),
        config.terminal_generation,
    );
    let mut refs = RefMap::new();
    let gain = refs.get_or_create(
        &mut renderer,
        "gain",
        "const",
        props! { "value" => 0.5 },
        vec![],
    )?;

    let tone = voice(args.freq, &gain);
    let stats = renderer.render([tone.clone(), tone])?;
    tracing::info!(
        nodes = stats.nodes_added,
        edges = stats.edges_added,
        props = stats.props_written,
        "initial render"
    );

    for step in 1..=args.updates {
        let value = 0.5 / (step + 1) as f64;
        refs.update(&mut renderer, "gain", props! { "value" => value })?;
        tracing::info!(value, "gain ref updated");
    }

    let swapped = voice(args.swap_freq, &gain);
    collect_until_stable(&mut renderer, &[swapped.clone(), swapped])?;

    tracing::info!(
        nodes = renderer.node_count(),
        batches = renderer.transport().batches(),
        "demo finished"
    );
    Ok(())
}

/// Renders `graphs` and steps the collector once per render until a step
/// deletes something, bounded by the terminal generation.
fn collect_until_stable<T: Transport>(
    renderer: &mut Renderer<T>,
    graphs: &[Node],
) -> anyhow::Result<()> {
    for _ in 0..renderer.terminal_generation() {
        renderer.render(graphs.iter().cloned())?;
        let gc = renderer.step_garbage_collector()?;
        if gc.nodes_removed > 0 {
            tracing::info!(removed = gc.nodes_removed, "collected unreachable voice");
            break;
        }
    }
    Ok(())
}
