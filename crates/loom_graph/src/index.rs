//! Per-Variant Indices
//!
//! For every enumerated variant, the nodes active under that variant's
//! keywords ([`NodesPerVariant`]) and the union of their requirements
//! ([`RequirementsPerVariant`]). One index is built per stage; the stage
//! indices can be merged with [`RequirementsPerVariant::union`] while staying
//! independently available.
//!
//! Keys are owned snapshots; insertion order is preserved so iteration is
//! deterministic.

use loom_core::errors::Result;
use loom_core::keywords::KeywordSet;
use rustc_hash::FxHashMap;

use crate::graph::MaterialGraph;
use crate::node::{NodeId, SlotId};
use crate::requirements::Requirements;
use crate::walker::GraphWalker;

/// Insertion-ordered map keyed by variant.
#[derive(Debug, Clone)]
struct VariantMap<V> {
    entries: Vec<(KeywordSet, V)>,
    lookup: FxHashMap<KeywordSet, usize>,
}

impl<V> Default for VariantMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }
}

impl<V> VariantMap<V> {
    fn get(&self, key: &KeywordSet) -> Option<&V> {
        self.lookup.get(key).map(|&i| &self.entries[i].1)
    }

    fn get_mut(&mut self, key: &KeywordSet) -> Option<&mut V> {
        self.lookup.get(key).map(|&i| &mut self.entries[i].1)
    }

    fn insert(&mut self, key: &KeywordSet, value: V) {
        if let Some(slot) = self.get_mut(key) {
            *slot = value;
            return;
        }
        self.lookup.insert(key.clone(), self.entries.len());
        self.entries.push((key.clone(), value));
    }
}

// ─── NodesPerVariant ─────────────────────────────────────────────────────────

/// Active nodes of one stage, per variant, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct NodesPerVariant {
    map: VariantMap<Vec<NodeId>>,
}

impl NodesPerVariant {
    /// Walks `root` once per variant with keyword gating, restricted to `slots`.
    pub fn build<'a, I>(
        walker: &GraphWalker<'_>,
        variants: I,
        root: NodeId,
        slots: &[SlotId],
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a KeywordSet>,
    {
        let mut index = Self::default();
        for variant in variants {
            if index.map.get(variant).is_some() {
                continue;
            }
            let nodes = walker.collect_nodes(root, Some(slots), Some(variant))?;
            index.map.insert(variant, nodes);
        }
        Ok(index)
    }

    #[must_use]
    pub fn get(&self, variant: &KeywordSet) -> Option<&[NodeId]> {
        self.map.get(variant).map(Vec::as_slice)
    }

    pub fn variants(&self) -> impl Iterator<Item = &KeywordSet> + '_ {
        self.map.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeywordSet, &[NodeId])> + '_ {
        self.map.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.entries.is_empty()
    }
}

// ─── RequirementsPerVariant ──────────────────────────────────────────────────

/// Aggregated requirements per variant.
#[derive(Debug, Clone, Default)]
pub struct RequirementsPerVariant {
    map: VariantMap<Requirements>,
}

impl RequirementsPerVariant {
    #[must_use]
    pub fn from_nodes(graph: &MaterialGraph, nodes: &NodesPerVariant) -> Self {
        let mut index = Self::default();
        for (variant, ids) in nodes.iter() {
            index.map.insert(variant, Requirements::from_nodes(graph, ids));
        }
        index
    }

    /// Merges two indices. Shared variants get the union of both requirement
    /// sets; keys keep `self`'s order followed by keys only `other` has.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (variant, req) in &other.map.entries {
            match merged.map.get_mut(variant) {
                Some(existing) => existing.union_with(req),
                None => merged.map.insert(variant, *req),
            }
        }
        merged
    }

    /// Requirements of `variant`; empty when the variant is unknown to this stage.
    #[must_use]
    pub fn get(&self, variant: &KeywordSet) -> Requirements {
        self.map.get(variant).copied().unwrap_or_default()
    }

    pub fn variants(&self) -> impl Iterator<Item = &KeywordSet> + '_ {
        self.map.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeywordSet, &Requirements)> + '_ {
        self.map.entries.iter().map(|(k, v)| (k, v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.entries.is_empty()
    }
}
