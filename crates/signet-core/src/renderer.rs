//! Renderer: the public entry point for reconciling graphs into a native engine.
//!
//! A [`Renderer`] owns one [`BatchDelegate`] (and therefore one node table) and
//! one injected [`Transport`]. Each call produces an independent instruction
//! batch: the delegate is cleared at the start of every render, ref update, or
//! GC step, and the packed batch is shipped at the end.
//!
//! Node-table mutation completes before the transport is called. A transport
//! failure is reported to the caller, but the table keeps the intended
//! post-batch state; recovering (re-sending a full snapshot, or rendering
//! again) is the caller's policy.
//!
//! # Example
//!
//! ```rust
//! use signet_core::{ops, props, RecordingTransport, Renderer};
//!
//! let mut renderer = Renderer::new(RecordingTransport::new());
//!
//! let cutoff = renderer.create_ref("const", props! { "value" => 800.0 }, vec![]).unwrap();
//! let voice = ops::mul(ops::cycle(110.0), cutoff.node());
//! let stats = renderer.render([voice.clone(), voice]).unwrap();
//! assert!(stats.nodes_added > 0);
//!
//! // Cheap parameter update: one set-property plus a commit.
//! renderer.update_ref(&cutoff, props! { "value" => 1200.0 }).unwrap();
//! assert_eq!(renderer.transport().last().unwrap().len(), 2);
//! ```

use std::time::{Duration, Instant};

use indexmap::IndexSet;

use crate::delegate::{BatchDelegate, MountedNode, RenderDelegate};
use crate::error::GraphError;
use crate::hydrate::HydrationPayload;
use crate::node::{Node, NodeHash, Operand};
use crate::props::{KEY_PROP, PropValue, Props, merge_changed};
use crate::reconciler;
use crate::transport::Transport;

/// Prefix of the synthetic identity key given to ref nodes.
pub const REF_KEY_PREFIX: &str = "__refKey:";

/// Statistics for one render call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStats<A> {
    /// The transport's acknowledgement.
    pub result: A,
    /// Create-node instructions in the batch.
    pub nodes_added: usize,
    /// Append-child instructions in the batch.
    pub edges_added: usize,
    /// Set-property instructions in the batch.
    pub props_written: usize,
    /// Time spent reconciling, excluding delivery.
    pub elapsed: Duration,
}

impl<A> RenderStats<A> {
    /// Reconcile time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Result of one garbage-collection step.
#[derive(Debug, Clone, PartialEq)]
pub struct GcStats<A> {
    /// Nodes deleted by this step.
    pub nodes_removed: usize,
    /// The transport's acknowledgement, or `None` when nothing was sent.
    pub result: Option<A>,
}

/// A persistently addressable leaf node created by [`Renderer::create_ref`].
///
/// Render [`node()`](Self::node) at least once, then push new props with
/// [`Renderer::update_ref`] without re-declaring the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct RefHandle {
    node: Node,
}

impl RefHandle {
    /// The ref's node, for placing into graphs.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// The ref's hash.
    pub fn hash(&self) -> NodeHash {
        self.node.hash()
    }
}

/// Reconciles declared graphs into a native engine through a transport.
pub struct Renderer<T> {
    delegate: BatchDelegate,
    transport: T,
    next_ref_id: u64,
}

impl<T: Transport> Renderer<T> {
    /// Creates a renderer with the default terminal generation.
    pub fn new(transport: T) -> Self {
        Self::with_delegate(BatchDelegate::new(), transport)
    }

    /// Creates a renderer whose collector deletes nodes after
    /// `terminal_generation` unreachable GC steps.
    pub fn with_terminal_generation(transport: T, terminal_generation: u32) -> Self {
        Self::with_delegate(
            BatchDelegate::with_terminal_generation(terminal_generation),
            transport,
        )
    }

    fn with_delegate(delegate: BatchDelegate, transport: T) -> Self {
        Self {
            delegate,
            transport,
            next_ref_id: 0,
        }
    }

    /// Reconciles one graph per output channel and ships the resulting batch.
    ///
    /// Bare numbers are resolved into constant nodes. The batch is packed as
    /// create, delete, append, set-property, activate-roots, commit.
    pub fn render<I>(&mut self, graphs: I) -> Result<RenderStats<T::Ack>, GraphError>
    where
        I: IntoIterator,
        I::Item: Into<Operand>,
    {
        let start = Instant::now();
        self.delegate.clear();

        let graphs: Vec<Node> = graphs
            .into_iter()
            .map(|g| Operand::into_node(g.into()))
            .collect();
        reconciler::render_with_delegate(&mut self.delegate, &graphs);

        let elapsed = start.elapsed();
        let counters = self.delegate.counters();
        let instructions = self.delegate.packed_instructions();
        tracing::debug!(
            "render: {} instructions, {} nodes, {} edges, {} props in {:?}",
            instructions.len(),
            counters.nodes_added,
            counters.edges_added,
            counters.props_written,
            elapsed
        );

        let result = self
            .transport
            .send(&instructions)
            .map_err(GraphError::transport)?;

        Ok(RenderStats {
            result,
            nodes_added: counters.nodes_added,
            edges_added: counters.edges_added,
            props_written: counters.props_written,
            elapsed,
        })
    }

    /// Creates a ref: a node with a unique synthetic key, so its identity does
    /// not depend on its props.
    ///
    /// A `"key"` entry in `props` is ignored; the synthetic key always wins.
    /// Fails with [`GraphError::EmptyKind`] if `kind` is empty.
    pub fn create_ref(
        &mut self,
        kind: impl Into<String>,
        props: Props,
        children: Vec<Node>,
    ) -> Result<RefHandle, GraphError> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(GraphError::EmptyKind);
        }
        let key = format!("{REF_KEY_PREFIX}{}", self.next_ref_id);
        self.next_ref_id += 1;

        let mut keyed = Props::with_capacity(props.len() + 1);
        keyed.insert(KEY_PROP.to_owned(), PropValue::String(key));
        keyed.extend(props.into_iter().filter(|(k, _)| k != KEY_PROP));

        Ok(RefHandle {
            node: Node::new(kind, keyed, children),
        })
    }

    /// Writes new props to a mounted ref and ships the small batch.
    ///
    /// Only props that differ from the last written snapshot are sent. Nothing
    /// else in the graph is visited.
    pub fn update_ref(&mut self, handle: &RefHandle, props: Props) -> Result<T::Ack, GraphError> {
        let hash = handle.hash();
        if !self.delegate.node_map().contains_key(&hash) {
            return Err(GraphError::RefNotMounted { hash });
        }

        self.delegate.clear();
        let changed = match self.delegate.node_map_mut().get_mut(&hash) {
            Some(record) => merge_changed(&mut record.props, &props),
            None => Vec::new(),
        };
        for (key, value) in &changed {
            self.delegate.set_property(hash, key, value);
        }
        self.delegate.commit_updates();

        let instructions = self.delegate.packed_instructions();
        tracing::debug!("update_ref: {hash} wrote {} props", changed.len());
        self.transport
            .send(&instructions)
            .map_err(GraphError::transport)
    }

    /// Runs one garbage-collection step and ships its batch if anything was
    /// deleted.
    ///
    /// Every mounted record ages by one generation per step; rendering resets
    /// the generation of reachable nodes. Step once per render (or on a timer
    /// slower than the render rate) so live nodes are never collected.
    pub fn step_garbage_collector(&mut self) -> Result<GcStats<T::Ack>, GraphError> {
        self.delegate.clear();
        reconciler::step_garbage_collector(&mut self.delegate);
        let nodes_removed = self.delegate.counters().nodes_removed;
        if self.delegate.batch().is_empty() {
            return Ok(GcStats {
                nodes_removed,
                result: None,
            });
        }

        let instructions = self.delegate.packed_instructions();
        let result = self
            .transport
            .send(&instructions)
            .map_err(GraphError::transport)?;
        Ok(GcStats {
            nodes_removed,
            result: Some(result),
        })
    }

    /// Seeds the node table from a hydration payload without emitting
    /// instructions. Returns the number of records seeded.
    ///
    /// Existing records with the same hash are replaced. The payload is
    /// validated before any record is inserted.
    pub fn hydrate(&mut self, payload: &HydrationPayload) -> Result<usize, GraphError> {
        let records = payload.records()?;
        let count = records.len();
        let map = self.delegate.node_map_mut();
        for record in records {
            map.insert(record.hash, record);
        }
        tracing::debug!("hydrate: seeded {count} nodes");
        Ok(count)
    }

    /// Captures every mounted record as a hydration payload.
    ///
    /// Hydrating a fresh renderer from the snapshot and rendering the same
    /// graphs emits only the changes since the snapshot was taken.
    pub fn snapshot(&self) -> HydrationPayload {
        let mut payload = HydrationPayload::new();
        for record in self.delegate.node_map().values() {
            payload.insert(record.hash, record.props.clone());
        }
        payload
    }

    /// Number of mounted records in the node table.
    pub fn node_count(&self) -> usize {
        self.delegate.node_map().len()
    }

    /// Returns `true` if `hash` is mounted.
    pub fn is_mounted(&self, hash: NodeHash) -> bool {
        self.delegate.node_map().contains_key(&hash)
    }

    /// The mounted record for `hash`.
    pub fn mounted(&self, hash: NodeHash) -> Option<&MountedNode> {
        self.delegate.node_map().get(&hash)
    }

    /// Root hashes activated by the latest render, in channel order.
    pub fn active_roots(&self) -> &IndexSet<NodeHash> {
        self.delegate.active_roots()
    }

    /// Generation at which unreachable nodes are collected.
    pub fn terminal_generation(&self) -> u32 {
        self.delegate.terminal_generation()
    }

    /// The injected transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;
    use crate::ops;
    use crate::props;
    use crate::transport::RecordingTransport;

    fn renderer() -> Renderer<RecordingTransport> {
        Renderer::new(RecordingTransport::new())
    }

    #[test]
    fn render_reports_counts_and_ships_one_batch() {
        let mut r = renderer();
        let stats = r.render([ops::phasor(2.0)]).unwrap();

        // root, phasor, const
        assert_eq!(stats.nodes_added, 3);
        assert_eq!(stats.edges_added, 2);
        // root.channel, const.value
        assert_eq!(stats.props_written, 2);
        assert_eq!(r.transport().batches().len(), 1);
        assert_eq!(stats.result, r.transport().last().unwrap().len());
    }

    #[test]
    fn bare_numbers_render_as_constants() {
        let mut r = renderer();
        r.render([0.5]).unwrap();
        assert!(r.is_mounted(Node::constant(0.5).hash()));
    }

    #[test]
    fn ref_keys_are_unique() {
        let mut r = renderer();
        let a = r.create_ref("const", props! { "value" => 1.0 }, vec![]).unwrap();
        let b = r.create_ref("const", props! { "value" => 1.0 }, vec![]).unwrap();
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.node().key(), Some("__refKey:0"));
        assert_eq!(b.node().key(), Some("__refKey:1"));
    }

    #[test]
    fn user_key_cannot_override_ref_key() {
        let mut r = renderer();
        let a = r.create_ref("const", props! { "key" => "mine", "value" => 1.0 }, vec![]).unwrap();
        assert_eq!(a.node().key(), Some("__refKey:0"));
        assert_eq!(a.node().props().len(), 2);
    }

    #[test]
    fn empty_ref_kind_is_rejected_without_consuming_an_id() {
        let mut r = renderer();
        assert!(matches!(
            r.create_ref("", props! { "value" => 1.0 }, vec![]),
            Err(GraphError::EmptyKind)
        ));
        let a = r.create_ref("const", props! { "value" => 1.0 }, vec![]).unwrap();
        assert_eq!(a.node().key(), Some("__refKey:0"));
    }

    #[test]
    fn unmounted_ref_update_fails_without_sending() {
        let mut r = renderer();
        let a = r.create_ref("const", props! { "value" => 1.0 }, vec![]).unwrap();
        let err = r.update_ref(&a, props! { "value" => 2.0 }).unwrap_err();
        assert!(matches!(err, GraphError::RefNotMounted { hash } if hash == a.hash()));
        assert!(r.transport().batches().is_empty());
    }

    #[test]
    fn ref_update_sends_only_changed_props() {
        let mut r = renderer();
        let a = r.create_ref("const", props! { "value" => 1.0 }, vec![]).unwrap();
        r.render([a.node().clone()]).unwrap();

        r.update_ref(&a, props! { "value" => 2.0 }).unwrap();
        assert_eq!(
            r.transport().last().unwrap(),
            &[
                Instruction::SetProperty {
                    hash: a.hash(),
                    key: "value".into(),
                    value: PropValue::Number(2.0),
                },
                Instruction::CommitUpdates,
            ]
        );

        // Same value again: commit only.
        r.update_ref(&a, props! { "value" => 2.0 }).unwrap();
        assert_eq!(r.transport().last().unwrap(), &[Instruction::CommitUpdates]);
        assert_eq!(r.mounted(a.hash()).unwrap().props["value"], PropValue::Number(2.0));
    }

    #[test]
    fn gc_step_without_deletions_sends_nothing() {
        let mut r = renderer();
        r.render([ops::sr()]).unwrap();
        let stats = r.step_garbage_collector().unwrap();
        assert_eq!(stats.nodes_removed, 0);
        assert!(stats.result.is_none());
        assert_eq!(r.transport().batches().len(), 1);
    }

    #[test]
    fn transport_errors_propagate_without_rollback() {
        let mut r = Renderer::new(|_: &[Instruction]| {
            Err::<(), _>(std::io::Error::other("engine offline"))
        });
        let err = r.render([ops::sr()]).unwrap_err();
        assert!(matches!(err, GraphError::Transport(_)));
        // root + sr stay mounted
        assert_eq!(r.node_count(), 2);
    }

    #[test]
    fn hydrate_seeds_without_instructions() {
        let mut r = renderer();
        let node = ops::constant(440.0);
        let mut payload = HydrationPayload::new();
        payload.insert(node.hash(), node.props().clone());

        assert_eq!(r.hydrate(&payload).unwrap(), 1);
        assert!(r.transport().batches().is_empty());

        let stats = r.render([node.clone()]).unwrap();
        // Only the root is new; the hydrated constant is diffed and unchanged.
        assert_eq!(stats.nodes_added, 1);
        assert_eq!(stats.props_written, 1);
        assert_eq!(r.mounted(node.hash()).unwrap().kind, "const");
    }

    #[test]
    fn snapshot_round_trips_through_hydration() {
        let mut r = renderer();
        let graph = ops::mul(ops::phasor(220.0), 0.25);
        r.render([graph.clone()]).unwrap();

        let json = r.snapshot().to_json().unwrap();
        let mut resumed = renderer();
        resumed
            .hydrate(&HydrationPayload::from_json(&json).unwrap())
            .unwrap();
        assert_eq!(resumed.node_count(), r.node_count());

        let stats = resumed.render([graph]).unwrap();
        assert_eq!(stats.nodes_added, 0);
        assert_eq!(stats.edges_added, 0);
        assert_eq!(stats.props_written, 0);
    }

    #[test]
    fn hydrate_is_all_or_nothing() {
        let mut r = renderer();
        let payload = HydrationPayload::from_json(r#"{"1f": {}, "nope": {}}"#).unwrap();
        assert!(r.hydrate(&payload).is_err());
        assert_eq!(r.node_count(), 0);
    }
}
