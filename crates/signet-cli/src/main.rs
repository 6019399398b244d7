//! Signet CLI - render signal-graph documents into native instruction batches.
//!
//! Instruction batches are written to stdout, one JSON batch per line (or
//! indented with `--pretty`); logs go to stderr.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "signet")]
#[command(author, version, about = "Content-addressed signal-graph reconciler", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./signet.toml, then the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile graph documents and print the instruction batches
    Render(commands::render::RenderArgs),

    /// Print structural hashes of a graph document
    Hash(commands::hash::HashArgs),

    /// Run a scripted session: render, update a ref, swap a voice, collect garbage
    Demo(commands::demo::DemoArgs),

    /// Show or create the configuration file
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::common::load_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render(args) => commands::render::run(args, &config),
        Commands::Hash(args) => commands::hash::run(args),
        Commands::Demo(args) => commands::demo::run(args, &config),
        Commands::Config(args) => commands::config::run(args, &config),
    }
}
