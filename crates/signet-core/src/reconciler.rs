//! Graph reconciliation: mount, visit, render, and generation-based GC.
//!
//! The reconciler brings the node table (and, through the delegate's recorded
//! instructions, the native engine) into sync with a freshly declared forest of
//! graph roots:
//!
//! 1. Every top-level graph is wrapped in a synthetic `root {channel: i}` node,
//!    giving each output channel a distinct identity.
//! 2. An iterative preorder traversal visits each distinct hash once per pass.
//!    Shared sub-graphs therefore mount exactly once, however many parents
//!    reference them.
//! 3. [`mount`] creates unseen nodes (create, props, edges) and diffs the props
//!    of known ones.
//! 4. Root activation is emitted only when the root set changed; a commit is
//!    always emitted.
//!
//! Nodes are never deleted by rendering. [`step_garbage_collector`] ages every
//! record by one generation and deletes those that reach the delegate's
//! terminal generation. Mounting resets a record's generation to zero, so only
//! nodes that stayed unreachable for `terminal` consecutive steps are collected.

use std::collections::HashSet;

use crate::delegate::{HYDRATED_KIND, MountedNode, RenderDelegate};
use crate::node::{Node, NodeHash};
use crate::props::merge_changed;

/// Kind of the synthetic per-channel root node.
pub const ROOT_KIND: &str = "root";

/// Wraps a channel graph in its synthetic `root {channel}` node.
pub fn root_node(channel: usize, graph: Node) -> Node {
    Node::new(ROOT_KIND, crate::props! { "channel" => channel }, vec![graph])
}

/// Ensures the native counterpart of `node` exists and is up to date.
///
/// Known hashes get a props diff and a generation reset; unknown hashes are
/// created with all props written and all child edges appended. Children are
/// not visited here.
pub fn mount<D: RenderDelegate + ?Sized>(delegate: &mut D, node: &Node) {
    let hash = node.hash();

    if let Some(existing) = delegate.node_map_mut().get_mut(&hash) {
        existing.generation = 0;
        if existing.kind == HYDRATED_KIND {
            existing.kind = node.kind().to_owned();
        }
        let changed = merge_changed(&mut existing.props, node.props());
        for (key, value) in &changed {
            delegate.set_property(hash, key, value);
        }
        return;
    }

    tracing::debug!("mount: create {} {hash}", node.kind());
    delegate.create_node(hash, node.kind());

    let mut record = MountedNode::from_node(node);
    for (key, value) in &merge_changed(&mut record.props, node.props()) {
        delegate.set_property(hash, key, value);
    }
    for child in node.children() {
        delegate.append_child(hash, child.hash());
    }
    delegate.node_map_mut().insert(hash, record);
}

/// Mounts every node reachable from `roots` once, in preorder.
///
/// Uses an explicit stack, so graph depth is bounded by memory rather than by
/// the call stack. Hashes already in `visit_set` are skipped together with
/// their subtrees.
pub fn visit<D: RenderDelegate + ?Sized>(
    delegate: &mut D,
    visit_set: &mut HashSet<NodeHash>,
    roots: &[Node],
) {
    let mut stack: Vec<Node> = roots.iter().rev().cloned().collect();
    while let Some(node) = stack.pop() {
        if !visit_set.insert(node.hash()) {
            continue;
        }
        mount(delegate, &node);
        stack.extend(node.children().iter().rev().cloned());
    }
}

/// Reconciles a forest of channel graphs against the delegate's node table.
///
/// Returns the root hashes in channel order.
pub fn render_with_delegate<D: RenderDelegate + ?Sized>(
    delegate: &mut D,
    graphs: &[Node],
) -> Vec<NodeHash> {
    let roots: Vec<Node> = graphs
        .iter()
        .enumerate()
        .map(|(channel, graph)| root_node(channel, graph.clone()))
        .collect();

    let mut visit_set = HashSet::new();
    visit(delegate, &mut visit_set, &roots);

    let hashes: Vec<NodeHash> = roots.iter().map(Node::hash).collect();
    let active = delegate.active_roots();
    let already_active =
        hashes.len() == active.len() && hashes.iter().all(|h| active.contains(h));
    if already_active {
        tracing::debug!("render: {} roots already active", hashes.len());
    } else {
        tracing::debug!("render: activating {} roots", hashes.len());
        delegate.activate_roots(&hashes);
    }

    delegate.commit_updates();
    hashes
}

/// Ages every mounted record by one generation and deletes terminal ones.
///
/// Emits a commit only when something was deleted. Returns the number of
/// deleted nodes.
pub fn step_garbage_collector<D: RenderDelegate + ?Sized>(delegate: &mut D) -> usize {
    let terminal = delegate.terminal_generation();

    let mut doomed = Vec::new();
    for record in delegate.node_map_mut().values_mut() {
        record.generation = record.generation.saturating_add(1);
        if record.generation >= terminal {
            doomed.push(record.hash);
        }
    }

    if doomed.is_empty() {
        return 0;
    }

    for &hash in &doomed {
        delegate.delete_node(hash);
    }
    delegate.commit_updates();
    delegate
        .node_map_mut()
        .retain(|_, record| record.generation < terminal);

    tracing::debug!("gc: deleted {} nodes", doomed.len());
    doomed.len()
}
