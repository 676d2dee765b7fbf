//! Variant Enumeration Tests
//!
//! Tests for:
//! - VariantEnumerator: independent groups, merged groups, empty graphs, limits
//! - Stage union: groups reachable only from the vertex slots still enumerate
//! - NodesPerVariant / RequirementsPerVariant: keyword gating of the walk
//! - Property: branch conditions are pairwise mutually exclusive

use loom::{
    GraphWalker, KeywordBranch, KeywordSet, LoomError, MaterialGraph, NeededSpace, Node, NodeId,
    NodesPerVariant, Requirements, RequirementsPerVariant, SlotId, ValueType, VariantEnumerator,
};
use proptest::prelude::*;

const OUT: u32 = 100;

/// Keyword node with one input per option, all routed by a single group.
fn keyword_node(name: &str, options: &[&str]) -> Node {
    let mut node = Node::new(name).with_output(OUT, "Out", ValueType::Float);
    let mut routes = Vec::new();
    for (i, option) in options.iter().enumerate() {
        let id = i as u32;
        node = node.with_input(id, format!("In{id}"), ValueType::Float);
        routes.push((*option, SlotId(id)));
    }
    node.with_keyword_branch(KeywordBranch::new().with_group(routes))
}

fn master(graph: &mut MaterialGraph, feeders: &[NodeId]) -> NodeId {
    let mut node = Node::new("Master");
    for i in 0..feeders.len() {
        node = node.with_input(i as u32, format!("Slot{i}"), ValueType::Float);
    }
    let id = graph.add_node(node);
    for (i, &feeder) in feeders.iter().enumerate() {
        graph.link(feeder, OUT, id, i as u32).unwrap();
    }
    id
}

fn slots(n: usize) -> Vec<SlotId> {
    (0..n as u32).map(SlotId).collect()
}

fn set(names: &[&str]) -> KeywordSet {
    names.iter().copied().collect()
}

// ============================================================================
// Enumeration
// ============================================================================

#[test]
fn enumerate_two_independent_groups() {
    let mut graph = MaterialGraph::new();
    let x = graph.add_node(keyword_node("X", &["_", "X"]));
    let y = graph.add_node(keyword_node("Y", &["_", "Y"]));
    let root = master(&mut graph, &[x, y]);

    let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
    e.collect_groups(root, &slots(2)).unwrap();
    let ordered = e.enumerate("Forward").unwrap().ordered();

    assert_eq!(ordered.len(), 4);
    for expected in [set(&["X"]), set(&["Y"]), set(&["X", "Y"])] {
        assert!(ordered.contains(&expected));
    }
    assert!(ordered.last().unwrap().is_empty());
}

#[test]
fn enumerate_no_keyword_nodes() {
    let mut graph = MaterialGraph::new();
    let plain = graph.add_node(Node::new("Plain").with_output(OUT, "Out", ValueType::Float));
    let root = master(&mut graph, &[plain]);

    let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
    e.collect_groups(root, &slots(1)).unwrap();
    let variants = e.enumerate("Forward").unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants.ordered(), vec![KeywordSet::new()]);
}

#[test]
fn enumerate_distinct_nodes_same_result_set() {
    let mut graph = MaterialGraph::new();
    let a = graph.add_node(keyword_node("A", &["_", "X"]));
    let b = graph.add_node(keyword_node("B", &["X", "_"]));
    let c = graph.add_node(keyword_node("C", &["X"]));
    let root = master(&mut graph, &[a, b, c]);

    let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
    e.collect_groups(root, &slots(3)).unwrap();
    let ordered = e.enumerate("Forward").unwrap().ordered();
    assert_eq!(ordered, vec![set(&["X"]), KeywordSet::new()]);
}

#[test]
fn enumerate_group_without_default_still_ends_with_empty() {
    let mut graph = MaterialGraph::new();
    let a = graph.add_node(keyword_node("A", &["LOW", "HIGH"]));
    let root = master(&mut graph, &[a]);

    let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
    e.collect_groups(root, &slots(1)).unwrap();
    let variants = e.enumerate("Forward").unwrap();
    assert_eq!(variants.len(), 2);
    assert_eq!(variants.ordered(), vec![set(&["LOW"]), set(&["HIGH"]), KeywordSet::new()]);
}

#[test]
fn enumerate_across_stage_slot_lists() {
    let mut graph = MaterialGraph::new();
    let vertex_kw = graph.add_node(keyword_node("V", &["_", "WIND"]));
    let pixel_kw = graph.add_node(keyword_node("P", &["_", "DETAIL"]));
    let root = master(&mut graph, &[pixel_kw, vertex_kw]);

    let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
    e.collect_groups(root, &[SlotId(1)]).unwrap();
    e.collect_groups(root, &[SlotId(0)]).unwrap();
    let variants = e.enumerate("Forward").unwrap();
    assert_eq!(variants.len(), 4);
    assert_eq!(variants.universe(), set(&["DETAIL", "WIND"]));
}

#[test]
fn enumerate_limit_exceeded() {
    let mut graph = MaterialGraph::new();
    let feeders: Vec<NodeId> = (0..9)
        .map(|i| {
            let kw = format!("K{i}");
            graph.add_node(keyword_node(&kw, &["_", kw.as_str()]))
        })
        .collect();
    let root = master(&mut graph, &feeders);

    let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
    e.collect_groups(root, &slots(9)).unwrap();
    let err = e.enumerate("Forward").unwrap_err();
    assert!(matches!(err, LoomError::VariantLimitExceeded { count: 512, limit: 256, .. }));
    assert_eq!(err.pass_name(), Some("Forward"));
}

// ============================================================================
// Per-variant indices
// ============================================================================

#[test]
fn index_follows_only_routed_inputs() {
    let mut graph = MaterialGraph::new();
    let normal = graph.add_node(
        Node::new("Normal")
            .with_output(0, "Out", ValueType::Float)
            .with_requirements(Requirements::none().with_normal(NeededSpace::WORLD)),
    );
    let switch = graph.add_node(keyword_node("Switch", &["_", "USE_NORMAL"]));
    graph.link(normal, 0, switch, 1).unwrap();
    let root = master(&mut graph, &[switch]);

    let walker = GraphWalker::new(&graph);
    let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
    e.collect_groups(root, &slots(1)).unwrap();
    let variants = e.enumerate("Forward").unwrap().ordered();

    let nodes = NodesPerVariant::build(&walker, &variants, root, &slots(1)).unwrap();
    let reqs = RequirementsPerVariant::from_nodes(&graph, &nodes);

    assert!(nodes.get(&set(&["USE_NORMAL"])).unwrap().contains(&normal));
    assert!(!nodes.get(&KeywordSet::new()).unwrap().contains(&normal));
    assert_eq!(reqs.get(&set(&["USE_NORMAL"])).normal, NeededSpace::WORLD);
    assert!(reqs.get(&KeywordSet::new()).is_empty());
}

// ============================================================================
// Mutual exclusivity
// ============================================================================

/// Evaluates a `defined(A) && !defined(B)` condition under `defined`.
fn eval_guard(expr: &str, defined: &KeywordSet) -> bool {
    expr.split(" && ").all(|term| match term.strip_prefix('!') {
        Some(rest) => !defined.contains(&rest["defined(".len()..rest.len() - 1]),
        None => defined.contains(&term["defined(".len()..term.len() - 1]),
    })
}

fn groups_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    let option = prop::sample::select(vec!["_", "A", "B", "C", "D", "E"]).prop_map(String::from);
    prop::collection::vec(prop::collection::vec(option, 1..4), 0..5)
}

proptest! {
    #[test]
    fn branch_conditions_are_mutually_exclusive(groups in groups_strategy(), assignment in prop::collection::vec(any::<bool>(), 5)) {
        let mut graph = MaterialGraph::new();
        let feeders: Vec<NodeId> = groups
            .iter()
            .enumerate()
            .map(|(i, g)| {
                let options: Vec<&str> = g.iter().map(String::as_str).collect();
                graph.add_node(keyword_node(&format!("N{i}"), &options))
            })
            .collect();
        let root = master(&mut graph, &feeders);

        let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
        e.collect_groups(root, &slots(feeders.len())).unwrap();
        let variants = e.enumerate("P").unwrap();
        let universe = variants.universe();

        let defined: KeywordSet = ["A", "B", "C", "D", "E"]
            .iter()
            .zip(&assignment)
            .filter(|(_, on)| **on)
            .map(|(k, _)| *k)
            .collect();

        let matching: Vec<KeywordSet> = variants
            .ordered()
            .into_iter()
            .filter(|v| !v.is_empty())
            .filter(|v| v.guard_expression(&universe).is_some_and(|g| eval_guard(&g, &defined)))
            .collect();

        prop_assert!(matching.len() <= 1);
        if let Some(hit) = matching.first() {
            let mut restricted = KeywordSet::new();
            for k in defined.names().filter(|k| universe.contains(k)) {
                restricted.insert(k);
            }
            prop_assert_eq!(hit, &restricted);
        }
    }
}
