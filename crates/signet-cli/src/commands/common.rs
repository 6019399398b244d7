//! Shared CLI helpers used across multiple commands.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use signet_config::{OutputFormat, RendererConfig, find_config};
use signet_core::{Instruction, Node, Transport, graphs_from_json};

/// Load the configuration named on the command line, or the first one found
/// on the search path, or the defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<RendererConfig> {
    if let Some(path) = explicit
        && !path.is_file()
    {
        anyhow::bail!("config file '{}' not found", path.display());
    }

    match find_config(explicit) {
        Some(path) => RendererConfig::load(&path)
            .with_context(|| format!("loading config '{}'", path.display())),
        None => Ok(RendererConfig::default()),
    }
}

/// Read and decode a JSON graph document into one graph per channel.
pub fn read_graphs(path: &Path) -> anyhow::Result<Vec<Node>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading graph document '{}'", path.display()))?;
    graphs_from_json(&text).with_context(|| format!("decoding '{}'", path.display()))
}

/// Transport that writes each batch as JSON to a writer.
pub struct BatchPrinter<W> {
    writer: W,
    format: OutputFormat,
    batches: usize,
}

impl<W: Write> BatchPrinter<W> {
    /// Create a printer writing to `writer` in `format`.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            batches: 0,
        }
    }

    /// Number of batches written so far.
    pub fn batches(&self) -> usize {
        self.batches
    }
}

impl BatchPrinter<io::Stdout> {
    /// Create a printer writing to stdout.
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> Transport for BatchPrinter<W> {
    type Ack = usize;
    type Error = io::Error;

    fn send(&mut self, batch: &[Instruction]) -> io::Result<usize> {
        match self.format {
            OutputFormat::Json => serde_json::to_writer(&mut self.writer, batch)?,
            OutputFormat::Pretty => serde_json::to_writer_pretty(&mut self.writer, batch)?,
        }
        writeln!(self.writer)?;
        self.writer.flush()?;
        self.batches += 1;
        Ok(batch.len())
    }
}
