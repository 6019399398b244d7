//! Error types for graph construction, ref updates, and transport delivery.

use thiserror::Error;

use crate::node::NodeHash;

/// Boxed error returned by a [`Transport`](crate::Transport) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building, rendering, or updating a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A graph-building call received a value that is neither a number nor a node.
    #[error("invalid operand at position {position} of '{kind}': expected a number or a node, found {found}")]
    InvalidOperand {
        /// Kind of the node being built.
        kind: String,
        /// Zero-based child position of the offending operand.
        position: usize,
        /// Short description of the value that was found.
        found: String,
    },

    /// A node description had an empty kind.
    #[error("node kind must not be empty")]
    EmptyKind,

    /// A ref setter was called before the ref's node was ever rendered.
    #[error("cannot update ref {hash}: it has not been mounted; render its node first")]
    RefNotMounted {
        /// Hash of the unmounted ref node.
        hash: NodeHash,
    },

    /// [`RefMap::update`](crate::RefMap::update) targeted an unregistered name.
    #[error("no ref registered under name '{0}'")]
    MissingRef(String),

    /// A hydration payload key was not a valid hexadecimal node hash.
    #[error("invalid hydration key '{0}': expected a hexadecimal node hash")]
    InvalidHydration(String),

    /// A JSON graph document or hydration payload could not be parsed.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The transport failed to deliver an instruction batch.
    ///
    /// The node table is not rolled back; it is ahead of the native engine.
    #[error("transport failed: {0}")]
    Transport(#[source] BoxError),
}

impl GraphError {
    /// Wraps a transport failure.
    pub fn transport(source: impl Into<BoxError>) -> Self {
        GraphError::Transport(source.into())
    }
}
