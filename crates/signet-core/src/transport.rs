//! The injected transport that carries instruction batches to the native engine.
//!
//! The reconciler makes no assumption about the wire format. A transport
//! receives the packed batch and eventually returns the engine's
//! acknowledgement, or an error. Any `FnMut(&[Instruction]) -> Result<A, E>`
//! closure is a transport:
//!
//! ```rust
//! use signet_core::{Instruction, Renderer, ops};
//!
//! let mut sent = Vec::new();
//! let mut renderer = Renderer::new(|batch: &[Instruction]| {
//!     sent.push(serde_json::to_string(batch)?);
//!     Ok::<_, serde_json::Error>(())
//! });
//! renderer.render([ops::cycle(440.0)]).unwrap();
//! ```
//!
//! Delivery failures surface as [`GraphError::Transport`](crate::GraphError::Transport);
//! the node table is never rolled back and nothing is retried.
//!
//! `send` is synchronous. An async host wraps a channel sender in the closure
//! and awaits the engine's acknowledgements on the receiving task:
//!
//! ```rust
//! use std::sync::mpsc;
//!
//! use signet_core::{Instruction, Renderer, ops};
//!
//! let (tx, rx) = mpsc::channel::<Vec<Instruction>>();
//! let mut renderer = Renderer::new(move |batch: &[Instruction]| tx.send(batch.to_vec()));
//! renderer.render([ops::sr()]).unwrap();
//! assert_eq!(rx.recv().unwrap().last(), Some(&Instruction::CommitUpdates));
//! ```

use crate::error::BoxError;
use crate::instruction::Instruction;

/// Sink for packed instruction batches.
pub trait Transport {
    /// The native engine's acknowledgement for one batch.
    type Ack;
    /// Delivery failure.
    type Error: Into<BoxError>;

    /// Delivers one batch. Called once per render, ref update, or non-empty GC step.
    fn send(&mut self, batch: &[Instruction]) -> Result<Self::Ack, Self::Error>;
}

impl<F, A, E> Transport for F
where
    F: FnMut(&[Instruction]) -> Result<A, E>,
    E: Into<BoxError>,
{
    type Ack = A;
    type Error = E;

    fn send(&mut self, batch: &[Instruction]) -> Result<A, E> {
        self(batch)
    }
}

/// Transport that keeps every delivered batch in memory.
///
/// Useful for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    batches: Vec<Vec<Instruction>>,
}

impl RecordingTransport {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All batches delivered so far, oldest first.
    pub fn batches(&self) -> &[Vec<Instruction>] {
        &self.batches
    }

    /// The most recently delivered batch.
    pub fn last(&self) -> Option<&[Instruction]> {
        self.batches.last().map(Vec::as_slice)
    }
}

impl Transport for RecordingTransport {
    type Ack = usize;
    type Error = std::convert::Infallible;

    /// Acknowledges with the batch length.
    fn send(&mut self, batch: &[Instruction]) -> Result<usize, Self::Error> {
        self.batches.push(batch.to_vec());
        Ok(batch.len())
    }
}
