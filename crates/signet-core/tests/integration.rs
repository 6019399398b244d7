//! Integration tests for signet-core reconciliation.
//!
//! Drives a [`Renderer`] through a [`RecordingTransport`] and checks the exact
//! instruction batches the native engine would receive: sub-graph dedup,
//! idempotent re-render, minimal prop diffs, debounced garbage collection, ref
//! isolation, hydration and the JSON wire format.

use signet_core::{
    HydrationPayload, Instruction, Node, NodeHash, PropValue, RecordingTransport, RefMap, Renderer,
    graphs_from_json, ops, props, root_node,
};

fn renderer() -> Renderer<RecordingTransport> {
    Renderer::new(RecordingTransport::new())
}

fn count(batch: &[Instruction], code: u8) -> usize {
    batch.iter().filter(|i| i.code() == code).count()
}

fn touched_hashes(batch: &[Instruction]) -> Vec<NodeHash> {
    batch
        .iter()
        .filter_map(|i| match i {
            Instruction::CreateNode { hash, .. }
            | Instruction::DeleteNode { hash }
            | Instruction::SetProperty { hash, .. } => Some(*hash),
            Instruction::AppendChild { parent, .. } => Some(*parent),
            Instruction::ActivateRoots { .. } | Instruction::CommitUpdates => None,
        })
        .collect()
}

// ============================================================================
// 1. Hash identity
// ============================================================================

#[test]
fn equal_constants_share_a_hash() {
    assert_eq!(ops::constant(440.0).hash(), ops::constant(440.0).hash());
    assert_ne!(ops::constant(440.0).hash(), ops::constant(441.0).hash());
}

#[test]
fn structure_changes_the_hash() {
    let base = ops::mul(ops::sr(), 2.0);
    assert_ne!(base.hash(), ops::div(ops::sr(), 2.0).hash(), "kind");
    assert_ne!(base.hash(), ops::mul(ops::sr(), 3.0).hash(), "child");
    assert_ne!(base.hash(), ops::mul(2.0, ops::sr()).hash(), "child order");
    assert!(base.hash().value() <= 0x7FFF_FFFF);
}

#[test]
fn channel_roots_are_distinct() {
    let tone = ops::cycle(440.0);
    assert_ne!(
        root_node(0, tone.clone()).hash(),
        root_node(1, tone).hash()
    );
}

// ============================================================================
// 2. Rendering
// ============================================================================

#[test]
fn shared_subgraph_mounts_once() {
    let mut r = renderer();
    let half = ops::mul(440.0, 0.5);
    let graph = ops::add(half.clone(), half);
    r.render([graph]).unwrap();

    let batch = r.transport().last().unwrap();
    // root, add, mul, const 440, const 0.5
    assert_eq!(count(batch, 0), 5);
    // root->add, add->mul twice, mul->440, mul->0.5
    assert_eq!(count(batch, 2), 5);
    assert_eq!(r.node_count(), 5);
}

#[test]
fn stereo_graph_shares_everything_but_roots() {
    let mut r = renderer();
    let tone = ops::mul(ops::cycle(440.0), 0.5);
    let stats = r.render([tone.clone(), tone]).unwrap();

    // 2 roots + sin, mul(tau), const tau, phasor, const 440, mul(0.5), const 0.5
    assert_eq!(stats.nodes_added, 9);
    assert_eq!(r.active_roots().len(), 2);
}

#[test]
fn batches_are_packed_in_category_order() {
    let mut r = renderer();
    r.render([ops::adsr(0.01, 1.0, 0.0, 0.0, 1.0), ops::saw(110.0)])
        .unwrap();

    let codes: Vec<u8> = r.transport().last().unwrap().iter().map(Instruction::code).collect();
    let mut sorted = codes.clone();
    sorted.sort_unstable();
    assert_eq!(codes, sorted);
    assert_eq!(codes.last(), Some(&5));
    assert_eq!(count(r.transport().last().unwrap(), 4), 1);
}

#[test]
fn identical_rerender_only_commits() {
    let mut r = renderer();
    let graph = ops::mul(ops::cycle(220.0), ops::input(0));
    r.render([graph.clone()]).unwrap();

    let stats = r.render([graph]).unwrap();
    assert_eq!(stats.nodes_added, 0);
    assert_eq!(stats.edges_added, 0);
    assert_eq!(stats.props_written, 0);
    assert_eq!(r.transport().last().unwrap(), &[Instruction::CommitUpdates]);
}

#[test]
fn keyed_leaf_change_writes_one_property() {
    let mut r = renderer();
    r.render([ops::cycle(ops::keyed_constant("freq", 440.0))])
        .unwrap();

    let stats = r
        .render([ops::cycle(ops::keyed_constant("freq", 441.0))])
        .unwrap();
    assert_eq!(stats.nodes_added, 0);
    assert_eq!(stats.props_written, 1);
    assert_eq!(
        r.transport().last().unwrap(),
        &[
            Instruction::SetProperty {
                hash: ops::keyed_constant("freq", 0.0).hash(),
                key: "value".into(),
                value: PropValue::Number(441.0),
            },
            Instruction::CommitUpdates,
        ]
    );
}

#[test]
fn changing_channel_count_reactivates_roots() {
    let mut r = renderer();
    let tone = ops::cycle(330.0);
    r.render([tone.clone()]).unwrap();
    r.render([tone.clone(), tone]).unwrap();

    let batch = r.transport().last().unwrap();
    // Only the new channel-1 root is created.
    assert_eq!(count(batch, 0), 1);
    assert_eq!(count(batch, 4), 1);
    assert_eq!(r.active_roots().len(), 2);
}

#[test]
fn empty_render_activates_no_roots_once() {
    let mut r = renderer();
    r.render([ops::sr()]).unwrap();
    r.render(Vec::<Node>::new()).unwrap();
    assert_eq!(
        r.transport().last().unwrap(),
        &[Instruction::ActivateRoots { roots: vec![] }, Instruction::CommitUpdates]
    );
    assert!(r.active_roots().is_empty());
}

// ============================================================================
// 3. Garbage collection
// ============================================================================

#[test]
fn unreachable_nodes_are_deleted_on_terminal_step() {
    let mut r = renderer();
    let old = ops::phasor(1.0);
    let new = ops::phasor(2.0);
    r.render([old.clone()]).unwrap();

    for step in 1..=4 {
        r.render([new.clone()]).unwrap();
        let stats = r.step_garbage_collector().unwrap();
        if step < 4 {
            assert_eq!(stats.nodes_removed, 0, "step {step}");
            assert!(stats.result.is_none());
        } else {
            // old root, old phasor, const 1
            assert_eq!(stats.nodes_removed, 3);
            assert!(stats.result.is_some());
        }
    }

    let batch = r.transport().last().unwrap();
    assert_eq!(count(batch, 1), 3);
    assert_eq!(batch.last(), Some(&Instruction::CommitUpdates));
    assert!(!r.is_mounted(old.hash()));
    assert!(r.is_mounted(new.hash()));
}

#[test]
fn rerendering_resets_generation() {
    let mut r = renderer();
    let graph = ops::tanh(ops::input(0));
    r.render([graph.clone()]).unwrap();
    for _ in 0..3 {
        r.step_garbage_collector().unwrap();
    }
    assert_eq!(r.mounted(graph.hash()).unwrap().generation, 3);

    r.render([graph.clone()]).unwrap();
    assert_eq!(r.mounted(graph.hash()).unwrap().generation, 0);
    for _ in 0..3 {
        assert_eq!(r.step_garbage_collector().unwrap().nodes_removed, 0);
    }
    assert_eq!(r.step_garbage_collector().unwrap().nodes_removed, 3);
    assert_eq!(r.node_count(), 0);
}

#[test]
fn terminal_generation_is_configurable() {
    let mut r = Renderer::with_terminal_generation(RecordingTransport::new(), 1);
    r.render([ops::time()]).unwrap();
    assert_eq!(r.terminal_generation(), 1);
    assert_eq!(r.step_garbage_collector().unwrap().nodes_removed, 2);

    let clamped = Renderer::with_terminal_generation(RecordingTransport::new(), 0);
    assert_eq!(clamped.terminal_generation(), 1);
}

#[test]
fn collected_nodes_are_recreated_on_demand() {
    let mut r = Renderer::with_terminal_generation(RecordingTransport::new(), 1);
    let graph = ops::abs(ops::input(1));
    r.render([graph.clone()]).unwrap();
    r.step_garbage_collector().unwrap();

    let stats = r.render([graph]).unwrap();
    assert_eq!(stats.nodes_added, 3);
}

// ============================================================================
// 4. Refs
// ============================================================================

#[test]
fn ref_update_touches_only_the_ref() {
    let mut r = renderer();
    let mut refs = RefMap::new();
    let freq = refs
        .get_or_create(&mut r, "freq", "const", props! { "value" => 440.0 }, vec![])
        .unwrap();
    let gain = refs
        .get_or_create(&mut r, "gain", "const", props! { "value" => 0.5 }, vec![])
        .unwrap();
    r.render([ops::mul(ops::cycle(freq.clone()), gain)]).unwrap();

    refs.update(&mut r, "freq", props! { "value" => 880.0 }).unwrap();
    let batch = r.transport().last().unwrap();
    assert_eq!(touched_hashes(batch), vec![freq.hash()]);
    assert_eq!(batch.len(), 2);
    assert_eq!(
        r.mounted(freq.hash()).unwrap().props["value"],
        PropValue::Number(880.0)
    );
}

#[test]
fn refs_with_equal_props_do_not_collide() {
    let mut r = renderer();
    let a = r.create_ref("const", props! { "value" => 1.0 }, vec![]).unwrap();
    let b = r.create_ref("const", props! { "value" => 1.0 }, vec![]).unwrap();
    r.render([ops::add(a.node(), b.node())]).unwrap();
    assert!(r.is_mounted(a.hash()));
    assert!(r.is_mounted(b.hash()));
    assert_ne!(a.hash(), ops::constant(1.0).hash());
}

// ============================================================================
// 5. Hydration
// ============================================================================

#[test]
fn hydrated_nodes_are_diffed_not_recreated() {
    let graph = ops::mul(ops::keyed_constant("gain", 0.25), ops::input(0));

    let mut first = renderer();
    first.render([graph]).unwrap();
    let snapshot = first.snapshot();

    let mut resumed = renderer();
    assert_eq!(resumed.hydrate(&snapshot).unwrap(), 4);

    let stats = resumed
        .render([ops::mul(ops::keyed_constant("gain", 0.75), ops::input(0))])
        .unwrap();
    assert_eq!(stats.nodes_added, 0);
    assert_eq!(stats.props_written, 1);
    let gain = resumed.mounted(ops::keyed_constant("gain", 0.0).hash()).unwrap();
    assert_eq!(gain.kind, "const");
}

#[test]
fn native_payload_hashes_match_small_constants() {
    // Reported by the native engine for `const {value: 0.000001}`.
    let payload = HydrationPayload::from_json(r#"{"4cc773ba": {"value": 0.000001}}"#).unwrap();
    let mut r = renderer();
    r.hydrate(&payload).unwrap();

    let stats = r.render([1e-6]).unwrap();
    // Only the root is new.
    assert_eq!(stats.nodes_added, 1);
    let record = r.mounted(ops::constant(1e-6).hash()).unwrap();
    assert_eq!(record.kind, "const");
}

// ============================================================================
// 6. Wire format and documents
// ============================================================================

#[test]
fn closure_transport_receives_json_tuples() {
    let mut wire = Vec::new();
    let mut r = Renderer::new(|batch: &[Instruction]| {
        wire.push(serde_json::to_value(batch)?);
        Ok::<_, serde_json::Error>(())
    });
    r.render([ops::constant(440.0)]).unwrap();
    drop(r);

    let batch = wire[0].as_array().unwrap();
    let const_hash = ops::constant(440.0).hash().value();
    assert_eq!(batch[0][0], 0);
    assert!(batch.iter().any(|i| *i == serde_json::json!([0, const_hash, "const"])));
    assert!(batch.iter().any(|i| *i == serde_json::json!([3, const_hash, "value", 440])));
    assert_eq!(batch.last().unwrap(), &serde_json::json!([5]));
}

#[test]
fn json_documents_render_like_built_graphs() {
    let doc = r#"[
        {"kind": "mul", "children": [{"kind": "phasor", "children": [2]}, 0.5]},
        {"kind": "in", "props": {"channel": 1}}
    ]"#;
    let mut from_doc = renderer();
    from_doc.render(graphs_from_json(doc).unwrap()).unwrap();

    let mut built = renderer();
    built
        .render([ops::mul(ops::phasor(2.0), 0.5), ops::input(1)])
        .unwrap();

    assert_eq!(from_doc.transport().last(), built.transport().last());
}
