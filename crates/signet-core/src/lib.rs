//! Signet Core - content-addressed signal-graph reconciler
//!
//! This crate turns declaratively described audio signal graphs into minimal
//! batches of mutation instructions for a native DSP engine. Graphs are
//! immutable trees of [`Node`]s; each node is identified by a structural hash,
//! so identical sub-graphs collapse into one native node and re-rendering an
//! unchanged graph sends nothing but a commit.
//!
//! # Core Abstractions
//!
//! ## Graph Description
//!
//! - [`Node`] - Immutable, hash-identified graph node
//! - [`Operand`] - A number or a node, resolved into a child
//! - [`Props`] / [`PropValue`] - Ordered, JSON-like node properties
//! - [`ops`] - Opcode helpers (`cycle`, `mul`, `adsr`, ...)
//! - [`document`] - JSON graph documents for non-Rust hosts
//!
//! ## Reconciliation
//!
//! - [`RenderDelegate`] - Capability interface the reconciler writes to
//! - [`BatchDelegate`] - Delegate that records an [`InstructionBatch`]
//! - [`reconciler`] - mount, visit, render and the generation-based collector
//!
//! ## Runtime
//!
//! - [`Renderer`] - Owns the node table and an injected [`Transport`]
//! - [`RefHandle`] / [`RefMap`] - Persistent parameter nodes updated without re-rendering
//! - [`HydrationPayload`] - Resume against an engine that kept running
//!
//! # Example
//!
//! ```rust
//! use signet_core::{ops, Instruction, RecordingTransport, Renderer};
//!
//! let mut renderer = Renderer::new(RecordingTransport::new());
//!
//! let tone = ops::mul(ops::cycle(440.0), 0.5);
//! renderer.render([tone.clone(), tone.clone()]).unwrap();
//!
//! // Rendering the same graphs again only commits.
//! renderer.render([tone.clone(), tone]).unwrap();
//! assert_eq!(renderer.transport().last().unwrap(), &[Instruction::CommitUpdates]);
//! ```
//!
//! # Design Principles
//!
//! - **Structural identity**: equal hashes mean the same native node
//! - **Minimal batches**: only new nodes, new edges and changed props are sent
//! - **Debounced deletion**: unreachable nodes survive a few GC steps before removal
//! - **Injected delivery**: the renderer never assumes how batches reach the engine

pub mod delegate;
pub mod document;
pub mod error;
pub mod hydrate;
pub mod instruction;
pub mod node;
pub mod ops;
pub mod props;
pub mod reconciler;
pub mod refs;
pub mod renderer;
pub mod transport;

// Re-export main types at crate root
pub use delegate::{
    BatchCounters, BatchDelegate, DEFAULT_TERMINAL_GENERATION, HYDRATED_KIND, MountedNode,
    NodeMap, RenderDelegate,
};
pub use document::{graphs_from_json, graphs_from_value, node_from_value};
pub use error::{BoxError, GraphError};
pub use hydrate::HydrationPayload;
pub use instruction::{Instruction, InstructionBatch};
pub use node::{CONST_KIND, Node, NodeHash, Operand, hash_node};
pub use props::{KEY_PROP, PropValue, Props, canonical_json};
pub use reconciler::{ROOT_KIND, root_node};
pub use refs::RefMap;
pub use renderer::{GcStats, REF_KEY_PREFIX, RefHandle, RenderStats, Renderer};
pub use transport::{RecordingTransport, Transport};
