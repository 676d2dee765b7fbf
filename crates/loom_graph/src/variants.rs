//! Variant Enumeration
//!
//! Turns the keyword groups declared by the nodes of a pass into the complete,
//! deduplicated list of [`KeywordSet`]s (variants) the pass must handle.
//!
//! # Algorithm
//!
//! 1. Walk every node structurally reachable from the root through the pass
//!    slots (no keyword gating).
//! 2. Collect the option groups of keyword-capable nodes, deduplicated by
//!    option set, in discovery order.
//! 3. Add the all-default group `{_}` so the empty combination exists.
//! 4. Take the cartesian product (last group varies fastest), drop `_` from
//!    each combination and deduplicate the resulting sets.
//!
//! The product size is the product of the group sizes and grows without
//! bound; it is checked against a configurable limit before enumerating.
//!
//! # Ordering
//!
//! [`VariantSet`] keeps discovery order. [`VariantSet::ordered`] relocates the
//! empty variant to the end, which is the order of the `#if / #elif / #else`
//! chain in generated code.

use loom_core::errors::{LoomError, Result};
use loom_core::interner::Symbol;
use loom_core::keywords::{self, KeywordGroup, KeywordSet};
use loom_core::scratch::{ScratchPool, VecPool};
use rustc_hash::FxHashSet;

use crate::node::{NodeId, SlotId};
use crate::walker::GraphWalker;

/// Default cap on the number of variants per pass.
pub const DEFAULT_MAX_VARIANTS: usize = 256;

// ─── VariantSet ──────────────────────────────────────────────────────────────

/// Insertion-ordered set of distinct variants.
#[derive(Debug, Clone, Default)]
pub struct VariantSet {
    ordered: Vec<KeywordSet>,
    seen: FxHashSet<KeywordSet>,
}

impl VariantSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a snapshot of `variant`. Returns `false` for a duplicate.
    pub fn insert(&mut self, variant: &KeywordSet) -> bool {
        if self.seen.contains(variant) {
            return false;
        }
        self.seen.insert(variant.clone());
        self.ordered.push(variant.clone());
        true
    }

    #[must_use]
    pub fn contains(&self, variant: &KeywordSet) -> bool {
        self.seen.contains(variant)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Variants in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &KeywordSet> + '_ {
        self.ordered.iter()
    }

    /// Variants in emission order: discovery order with the empty variant last.
    /// The empty variant is added when missing.
    #[must_use]
    pub fn ordered(&self) -> Vec<KeywordSet> {
        let mut out: Vec<KeywordSet> = self
            .ordered
            .iter()
            .filter(|v| !v.is_empty())
            .cloned()
            .collect();
        out.push(KeywordSet::new());
        out
    }

    /// Union of all keywords appearing in any variant.
    #[must_use]
    pub fn universe(&self) -> KeywordSet {
        let mut all = KeywordSet::new();
        for variant in &self.ordered {
            all.extend_from(variant);
        }
        all
    }
}

// ─── VariantEnumerator ───────────────────────────────────────────────────────

/// Collects keyword groups from one or more slot lists of a root node and
/// enumerates their combinations.
pub struct VariantEnumerator<'g> {
    walker: GraphWalker<'g>,
    groups: Vec<KeywordGroup>,
    seen: FxHashSet<KeywordGroup>,
    max_variants: usize,
    nodes: VecPool<NodeId>,
    indices: VecPool<usize>,
}

impl<'g> VariantEnumerator<'g> {
    #[must_use]
    pub fn new(walker: GraphWalker<'g>) -> Self {
        Self {
            walker,
            groups: Vec::new(),
            seen: FxHashSet::default(),
            max_variants: DEFAULT_MAX_VARIANTS,
            nodes: ScratchPool::new(),
            indices: ScratchPool::new(),
        }
    }

    #[must_use]
    pub fn with_limit(mut self, max_variants: usize) -> Self {
        self.max_variants = max_variants;
        self
    }

    /// Adds the groups declared by every node reachable from `root` through
    /// `slots`. May be called once per stage; groups are deduplicated across calls.
    pub fn collect_groups(&mut self, root: NodeId, slots: &[SlotId]) -> Result<()> {
        let mut nodes = self.nodes.acquire();
        self.walker.collect(root, Some(slots), None, &mut nodes)?;

        let graph = self.walker.graph();
        for &id in nodes.iter() {
            let Some(branch) = graph.node(id).and_then(|n| n.keyword_branch()) else {
                continue;
            };
            for group in branch.groups() {
                if group.is_empty() {
                    continue;
                }
                if self.seen.insert(group.clone()) {
                    self.groups.push(group.clone());
                }
            }
        }
        Ok(())
    }

    /// Declared groups in discovery order (the synthesized default group excluded).
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[KeywordGroup] {
        &self.groups
    }

    #[inline]
    #[must_use]
    pub fn walker(&self) -> &GraphWalker<'g> {
        &self.walker
    }

    /// Size of the cartesian product, saturating.
    #[must_use]
    pub fn product_size(&self) -> usize {
        self.groups
            .iter()
            .fold(1usize, |acc, g| acc.saturating_mul(g.len()))
    }

    /// Enumerates all distinct variants. Fails with `VariantLimitExceeded`
    /// before doing any work when the product exceeds the limit.
    pub fn enumerate(&self, pass: &str) -> Result<VariantSet> {
        let count = self.product_size();
        if count > self.max_variants {
            return Err(LoomError::VariantLimitExceeded {
                pass: pass.to_string(),
                count,
                limit: self.max_variants,
            });
        }

        let default_group = KeywordGroup::all_default();
        let mut lists: Vec<&[Symbol]> = self.groups.iter().map(KeywordGroup::options).collect();
        if !self.seen.contains(&default_group) {
            lists.push(default_group.options());
        }

        let mut variants = VariantSet::new();
        let mut indices = self.indices.acquire();
        indices.resize(lists.len(), 0);
        let mut current = KeywordSet::new();

        loop {
            current.clear();
            for (list, &i) in lists.iter().zip(indices.iter()) {
                let keyword = list[i];
                if !keywords::is_default(keyword) {
                    current.insert_symbol(keyword);
                }
            }
            variants.insert(&current);

            // Odometer increment, last list fastest.
            let mut pos = lists.len();
            loop {
                if pos == 0 {
                    log::debug!(
                        "Pass '{}': {} keyword groups, {} variants",
                        pass,
                        self.groups.len(),
                        variants.len()
                    );
                    return Ok(variants);
                }
                pos -= 1;
                if indices[pos] + 1 < lists[pos].len() {
                    indices[pos] += 1;
                    break;
                }
                indices[pos] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MaterialGraph;
    use crate::node::{KeywordBranch, Node, ValueType};

    fn keyword_node(options: &[&str]) -> Node {
        let mut node = Node::new("Keyword").with_output(100, "Out", ValueType::Float);
        let mut routes = Vec::new();
        for (i, option) in options.iter().enumerate() {
            let id = i as u32;
            node = node.with_input(id, format!("In{id}"), ValueType::Float);
            routes.push((*option, SlotId(id)));
        }
        node.with_keyword_branch(KeywordBranch::new().with_group(routes))
    }

    fn master_with(graph: &mut MaterialGraph, feeders: &[NodeId]) -> NodeId {
        let mut master = Node::new("Master");
        for i in 0..feeders.len() {
            master = master.with_input(i as u32, format!("Slot{i}"), ValueType::Float);
        }
        let master = graph.add_node(master);
        for (i, &f) in feeders.iter().enumerate() {
            graph.link(f, 100, master, i as u32).unwrap();
        }
        master
    }

    fn names(set: &KeywordSet) -> Vec<&'static str> {
        set.names().collect()
    }

    #[test]
    fn test_no_keyword_nodes_yield_single_empty_variant() {
        let mut graph = MaterialGraph::new();
        let master = master_with(&mut graph, &[]);
        let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
        e.collect_groups(master, &[]).unwrap();

        let variants = e.enumerate("Forward").unwrap();
        assert_eq!(variants.len(), 1);
        assert!(variants.ordered()[0].is_empty());
    }

    #[test]
    fn test_two_independent_groups() {
        let mut graph = MaterialGraph::new();
        let x = graph.add_node(keyword_node(&["_", "X"]));
        let y = graph.add_node(keyword_node(&["_", "Y"]));
        let master = master_with(&mut graph, &[x, y]);

        let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
        e.collect_groups(master, &[SlotId(0), SlotId(1)]).unwrap();
        let ordered = e.enumerate("Forward").unwrap().ordered();

        let listed: Vec<_> = ordered.iter().map(names).collect();
        assert_eq!(listed, vec![vec!["Y"], vec!["X"], vec!["X", "Y"], vec![]]);
    }

    #[test]
    fn test_identical_groups_are_merged() {
        let mut graph = MaterialGraph::new();
        let a = graph.add_node(keyword_node(&["_", "X"]));
        let b = graph.add_node(keyword_node(&["X", "_"]));
        let master = master_with(&mut graph, &[a, b]);

        let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
        e.collect_groups(master, &[SlotId(0), SlotId(1)]).unwrap();
        assert_eq!(e.groups().len(), 1);
        assert_eq!(e.enumerate("Forward").unwrap().len(), 2);
    }

    #[test]
    fn test_overlapping_groups_do_not_duplicate_variants() {
        let mut graph = MaterialGraph::new();
        let a = graph.add_node(keyword_node(&["_", "X"]));
        let b = graph.add_node(keyword_node(&["X", "Y"]));
        let master = master_with(&mut graph, &[a, b]);

        let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
        e.collect_groups(master, &[SlotId(0), SlotId(1)]).unwrap();
        let variants = e.enumerate("Forward").unwrap();

        // (_,X) (_,Y) (X,X) (X,Y) -> {X} {Y} {X,Y}; empty appended
        assert_eq!(variants.len(), 3);
        let ordered = variants.ordered();
        assert_eq!(ordered.len(), 4);
        assert!(ordered.last().unwrap().is_empty());
    }

    #[test]
    fn test_groups_outside_pass_slots_are_ignored() {
        let mut graph = MaterialGraph::new();
        let x = graph.add_node(keyword_node(&["_", "X"]));
        let y = graph.add_node(keyword_node(&["_", "Y"]));
        let master = master_with(&mut graph, &[x, y]);

        let mut e = VariantEnumerator::new(GraphWalker::new(&graph));
        e.collect_groups(master, &[SlotId(1)]).unwrap();
        assert_eq!(e.groups().len(), 1);
        assert_eq!(e.enumerate("Forward").unwrap().universe(), ["Y"].into_iter().collect::<KeywordSet>());
    }

    #[test]
    fn test_limit_is_checked_before_enumeration() {
        let mut graph = MaterialGraph::new();
        let a = graph.add_node(keyword_node(&["_", "A1", "A2"]));
        let b = graph.add_node(keyword_node(&["_", "B1", "B2"]));
        let master = master_with(&mut graph, &[a, b]);

        let mut e = VariantEnumerator::new(GraphWalker::new(&graph)).with_limit(8);
        e.collect_groups(master, &[SlotId(0), SlotId(1)]).unwrap();
        assert_eq!(e.product_size(), 9);

        match e.enumerate("Forward") {
            Err(LoomError::VariantLimitExceeded { pass, count, limit }) => {
                assert_eq!(pass, "Forward");
                assert_eq!(count, 9);
                assert_eq!(limit, 8);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
