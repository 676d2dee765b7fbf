//! Variant enumeration and pass generation benchmarks.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use loom::{
    ActiveFields, BuiltinTemplates, GraphWalker, KeywordBranch, MaterialGraph, Node, NodeId,
    SlotId, ValueType, VariantEnumerator, builtin,
};

/// Master node fed by `groups` independent two-way keyword switches.
fn switch_graph(groups: usize) -> (MaterialGraph, NodeId) {
    let mut graph = MaterialGraph::new();
    let mut master = Node::new("Master");
    for i in 0..groups {
        master = master.with_input(i as u32, format!("Slot{i}"), ValueType::Float);
    }
    let root = graph.add_node(master);

    for i in 0..groups {
        let keyword = format!("KEYWORD_{i}");
        let switch = graph.add_node(
            Node::new(format!("Switch{i}"))
                .with_input(0, "Off", ValueType::Float)
                .with_input(1, "On", ValueType::Float)
                .with_output(2, "Out", ValueType::Float)
                .with_keyword_branch(
                    KeywordBranch::new()
                        .with_group([("_", SlotId(0)), (keyword.as_str(), SlotId(1))]),
                ),
        );
        let source = graph.add_node(
            Node::new(format!("Value{i}"))
                .with_output(0, "Out", ValueType::Float)
                .with_code(format!("$Out = {i}.0;")),
        );
        // Infallible: both slots exist and the graph is acyclic.
        let _ = graph.link(source, 0, switch, 1);
        let _ = graph.link(switch, 2, root, i as u32);
    }
    (graph, root)
}

fn enumerate_variants(c: &mut Criterion) {
    let (graph, root) = switch_graph(6);
    let slots: Vec<SlotId> = (0..6).map(SlotId).collect();
    c.bench_function("enumerate_64_variants", |b| {
        b.iter(|| {
            let mut enumerator = VariantEnumerator::new(GraphWalker::new(&graph));
            let _ = enumerator.collect_groups(root, black_box(&slots));
            enumerator.enumerate("Bench").map(|v| v.len())
        });
    });
}

fn generate_forward_pass(c: &mut Criterion) {
    let (graph, root) = switch_graph(3);
    let generator = loom::PassGenerator::new(&graph, root, Arc::new(BuiltinTemplates));
    let pass = builtin::forward_pass(true, &[0, 1, 2], &[]);
    c.bench_function("generate_forward_8_variants", |b| {
        b.iter(|| {
            let mut active = ActiveFields::new();
            generator
                .generate_pass(black_box(&pass), &mut active)
                .map(|p| p.source_hash)
        });
    });
}

criterion_group!(benches, enumerate_variants, generate_forward_pass);
criterion_main!(benches);
