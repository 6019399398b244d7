//! Render graph documents through a stdout transport.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use signet_config::{OutputFormat, RendererConfig};
use signet_core::{HydrationPayload, Renderer};

use super::common::{BatchPrinter, read_graphs};

/// Reconcile one or more graph documents in sequence.
///
/// Each document is one render pass against the same node table, so passing
/// the same file twice prints a commit-only second batch.
#[derive(Args)]
pub struct RenderArgs {
    /// Graph documents (JSON), rendered in order
    #[arg(required = true, value_name = "GRAPH")]
    pub files: Vec<PathBuf>,

    /// Seed the node table from a hydration payload before the first render
    #[arg(long, value_name = "FILE")]
    pub hydrate: Option<PathBuf>,

    /// Write a hydration snapshot of the node table after the last render
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// GC steps after each render (overrides the config)
    #[arg(long)]
    pub gc_steps: Option<u32>,

    /// Unreachable GC steps before deletion (overrides the config)
    #[arg(long)]
    pub terminal_generation: Option<u32>,

    /// Print indented JSON
    #[arg(long)]
    pub pretty: bool,
}

/// Run the render command.
pub fn run(args: RenderArgs, config: &RendererConfig) -> anyhow::Result<()> {
    let format = if args.pretty {
        OutputFormat::Pretty
    } else {
        config.output
    };
    let terminal = args.terminal_generation.unwrap_or(config.terminal_generation);
    let gc_steps = args.gc_steps.unwrap_or(config.gc_steps_per_render);

    let mut renderer = Renderer::with_terminal_generation(BatchPrinter::stdout(format), terminal);

    if let Some(path) = &args.hydrate {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading hydration payload '{}'", path.display()))?;
        let payload = HydrationPayload::from_json(&text)?;
        let seeded = renderer.hydrate(&payload)?;
        tracing::info!(nodes = seeded, path = %path.display(), "hydrated");
    }

    for path in &args.files {
        let graphs = read_graphs(path)?;
        let stats = renderer.render(graphs)?;
        tracing::info!(
            file = %path.display(),
            instructions = stats.result,
            nodes = stats.nodes_added,
            edges = stats.edges_added,
            props = stats.props_written,
            ms = format!("{:.3}", stats.elapsed_ms()),
            "rendered"
        );

        for _ in 0..gc_steps {
            let gc = renderer.step_garbage_collector()?;
            if gc.nodes_removed > 0 {
                tracing::info!(removed = gc.nodes_removed, "collected");
            }
        }
    }

    if let Some(path) = &args.snapshot {
        let json = renderer.snapshot().to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("writing snapshot '{}'", path.display()))?;
        tracing::info!(nodes = renderer.node_count(), path = %path.display(), "snapshot written");
    }

    Ok(())
}
