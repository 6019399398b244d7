//! The render delegate: the reconciler's capability interface.
//!
//! The reconciler never talks to the native engine directly. It reads prior
//! mount state from, and writes mutations to, a [`RenderDelegate`]. The one
//! concrete implementation, [`BatchDelegate`], records mutations into an
//! [`InstructionBatch`] and keeps per-call counters; alternate delegates (a
//! dry-run previewer, a tracing recorder in tests) plug in without touching the
//! reconciler.

use indexmap::{IndexMap, IndexSet};

use crate::instruction::{Instruction, InstructionBatch};
use crate::node::{Node, NodeHash};
use crate::props::{PropValue, Props};

/// Default number of unreachable GC steps before a mounted node is deleted.
pub const DEFAULT_TERMINAL_GENERATION: u32 = 4;

/// Kind recorded for nodes seeded from a hydration payload.
pub const HYDRATED_KIND: &str = "__HYDRATED__";

/// The node table's record of one mounted native node.
#[derive(Debug, Clone, PartialEq)]
pub struct MountedNode {
    /// Structural hash, also the table key.
    pub hash: NodeHash,
    /// Opcode name, or [`HYDRATED_KIND`] for hydrated records.
    pub kind: String,
    /// Latest props snapshot written to the native engine.
    pub props: Props,
    /// Consecutive GC steps since this node was last reached by a render.
    pub generation: u32,
}

impl MountedNode {
    /// Creates a fresh record (generation zero) for a node being mounted.
    ///
    /// The props snapshot starts empty; it only holds what has been written.
    pub fn from_node(node: &Node) -> Self {
        Self {
            hash: node.hash(),
            kind: node.kind().to_owned(),
            props: Props::with_capacity(node.props().len()),
            generation: 0,
        }
    }

    /// Creates a placeholder record for a node that already exists natively.
    pub fn hydrated(hash: NodeHash, props: Props) -> Self {
        Self {
            hash,
            kind: HYDRATED_KIND.to_owned(),
            props,
            generation: 0,
        }
    }
}

/// Persistent mapping from hash to mounted record, in mount order.
pub type NodeMap = IndexMap<NodeHash, MountedNode>;

/// Sink for native graph mutations plus access to persistent mount state.
pub trait RenderDelegate {
    /// The persistent node table.
    fn node_map(&self) -> &NodeMap;

    /// Mutable access to the persistent node table.
    fn node_map_mut(&mut self) -> &mut NodeMap;

    /// Root hashes activated by the most recent `activate_roots` call.
    fn active_roots(&self) -> &IndexSet<NodeHash>;

    /// Generation at which unreachable nodes are collected.
    fn terminal_generation(&self) -> u32;

    /// Records creation of a native node.
    fn create_node(&mut self, hash: NodeHash, kind: &str);

    /// Records deletion of a native node.
    fn delete_node(&mut self, hash: NodeHash);

    /// Records a parent → child edge.
    fn append_child(&mut self, parent: NodeHash, child: NodeHash);

    /// Records one property write.
    fn set_property(&mut self, hash: NodeHash, key: &str, value: &PropValue);

    /// Records root activation and replaces the active root set.
    fn activate_roots(&mut self, roots: &[NodeHash]);

    /// Records the end of a batch.
    fn commit_updates(&mut self);
}

/// Per-call mutation counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchCounters {
    /// Create-node instructions recorded.
    pub nodes_added: usize,
    /// Delete-node instructions recorded.
    pub nodes_removed: usize,
    /// Append-child instructions recorded.
    pub edges_added: usize,
    /// Set-property instructions recorded.
    pub props_written: usize,
}

/// Delegate that batches instructions for delivery through a transport.
///
/// Owns the node table and active root set for exactly one renderer.
#[derive(Debug)]
pub struct BatchDelegate {
    node_map: NodeMap,
    active_roots: IndexSet<NodeHash>,
    terminal_generation: u32,
    counters: BatchCounters,
    batch: InstructionBatch,
}

impl BatchDelegate {
    /// Creates an empty delegate with the default terminal generation.
    pub fn new() -> Self {
        Self::with_terminal_generation(DEFAULT_TERMINAL_GENERATION)
    }

    /// Creates an empty delegate collecting nodes after `terminal_generation`
    /// unreachable GC steps. Values below 1 are raised to 1.
    pub fn with_terminal_generation(terminal_generation: u32) -> Self {
        Self {
            node_map: NodeMap::new(),
            active_roots: IndexSet::new(),
            terminal_generation: terminal_generation.max(1),
            counters: BatchCounters::default(),
            batch: InstructionBatch::new(),
        }
    }

    /// Resets per-call counters and the instruction batch. Mount state persists.
    pub fn clear(&mut self) {
        self.counters = BatchCounters::default();
        self.batch.clear();
    }

    /// Counters accumulated since the last [`clear`](Self::clear).
    pub fn counters(&self) -> BatchCounters {
        self.counters
    }

    /// The instructions recorded since the last [`clear`](Self::clear).
    pub fn batch(&self) -> &InstructionBatch {
        &self.batch
    }

    /// Recorded instructions in wire order.
    pub fn packed_instructions(&self) -> Vec<Instruction> {
        self.batch.pack()
    }
}

impl Default for BatchDelegate {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDelegate for BatchDelegate {
    fn node_map(&self) -> &NodeMap {
        &self.node_map
    }

    fn node_map_mut(&mut self) -> &mut NodeMap {
        &mut self.node_map
    }

    fn active_roots(&self) -> &IndexSet<NodeHash> {
        &self.active_roots
    }

    fn terminal_generation(&self) -> u32 {
        self.terminal_generation
    }

    fn create_node(&mut self, hash: NodeHash, kind: &str) {
        self.counters.nodes_added += 1;
        self.batch.push(Instruction::CreateNode {
            hash,
            kind: kind.to_owned(),
        });
    }

    fn delete_node(&mut self, hash: NodeHash) {
        self.counters.nodes_removed += 1;
        self.batch.push(Instruction::DeleteNode { hash });
    }

    fn append_child(&mut self, parent: NodeHash, child: NodeHash) {
        self.counters.edges_added += 1;
        self.batch.push(Instruction::AppendChild { parent, child });
    }

    fn set_property(&mut self, hash: NodeHash, key: &str, value: &PropValue) {
        self.counters.props_written += 1;
        self.batch.push(Instruction::SetProperty {
            hash,
            key: key.to_owned(),
            value: value.clone(),
        });
    }

    fn activate_roots(&mut self, roots: &[NodeHash]) {
        self.batch.push(Instruction::ActivateRoots {
            roots: roots.to_vec(),
        });
        self.active_roots = roots.iter().copied().collect();
    }

    fn commit_updates(&mut self) {
        self.batch.push(Instruction::CommitUpdates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_recorded_instructions() {
        let mut d = BatchDelegate::new();
        let a = NodeHash::from_raw(1);
        let b = NodeHash::from_raw(2);
        d.create_node(a, "sin");
        d.create_node(b, "const");
        d.append_child(a, b);
        d.set_property(b, "value", &PropValue::Number(1.0));
        d.delete_node(b);
        d.commit_updates();

        assert_eq!(
            d.counters(),
            BatchCounters {
                nodes_added: 2,
                nodes_removed: 1,
                edges_added: 1,
                props_written: 1,
            }
        );
        assert_eq!(d.packed_instructions().len(), 6);
    }

    #[test]
    fn clear_keeps_mount_state() {
        let mut d = BatchDelegate::new();
        let node = Node::constant(1.0);
        d.node_map_mut()
            .insert(node.hash(), MountedNode::from_node(&node));
        d.activate_roots(&[node.hash()]);
        d.create_node(node.hash(), "const");

        d.clear();
        assert!(d.batch().is_empty());
        assert_eq!(d.counters(), BatchCounters::default());
        assert_eq!(d.node_map().len(), 1);
        assert!(d.node_map()[&node.hash()].props.is_empty());
        assert!(d.active_roots().contains(&node.hash()));
    }

    #[test]
    fn terminal_generation_is_at_least_one() {
        assert_eq!(BatchDelegate::new().terminal_generation(), 4);
        assert_eq!(BatchDelegate::with_terminal_generation(0).terminal_generation(), 1);
        assert_eq!(BatchDelegate::with_terminal_generation(9).terminal_generation(), 9);
    }
}
