//! Depth-First Node Walker
//!
//! Collects the nodes reachable from a root through input edges, in
//! post-order: every node appears after all nodes feeding it, and the root
//! comes last. This is the evaluation order of generated code.
//!
//! # Gating
//!
//! - **Root slot filter**: only the root's inputs listed in the filter are
//!   followed. Upstream nodes always follow all their (gated) inputs.
//! - **Keyword gating**: when an active [`KeywordSet`] is given, keyword-capable
//!   nodes follow only their routed inputs. Without one, every input is
//!   followed (structural reachability).

use loom_core::errors::Result;
use loom_core::keywords::KeywordSet;
use loom_core::scratch::{ScratchPool, SetPool, VecPool};
use smallvec::SmallVec;

use crate::graph::MaterialGraph;
use crate::node::{NodeId, SlotId, SlotRef};

/// Depth-first collector bound to one graph. Owns the scratch buffers reused
/// across walks.
pub struct GraphWalker<'g> {
    graph: &'g MaterialGraph,
    visited: SetPool<NodeId>,
    stack: VecPool<(NodeId, bool)>,
}

impl<'g> GraphWalker<'g> {
    #[must_use]
    pub fn new(graph: &'g MaterialGraph) -> Self {
        Self {
            graph,
            visited: ScratchPool::new(),
            stack: ScratchPool::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &'g MaterialGraph {
        self.graph
    }

    /// Appends the nodes reachable from `root` to `out`, post-order.
    ///
    /// `root_slots` restricts the root's inputs (`None` follows all of them);
    /// `keywords` enables keyword gating.
    pub fn collect(
        &self,
        root: NodeId,
        root_slots: Option<&[SlotId]>,
        keywords: Option<&KeywordSet>,
        out: &mut Vec<NodeId>,
    ) -> Result<()> {
        self.graph.try_node(root)?;

        let mut visited = self.visited.acquire();
        let mut stack = self.stack.acquire();
        visited.extend(out.iter().copied());
        stack.push((root, false));

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));

            let Some(node) = self.graph.node(id) else {
                continue;
            };
            let mut inputs: SmallVec<[SlotId; 8]> = match keywords {
                Some(active) => node.input_slots_for(active),
                None => node.input_slots().map(|s| s.id).collect(),
            };
            if id == root
                && let Some(filter) = root_slots
            {
                inputs.retain(|slot| filter.contains(slot));
            }

            // Reverse push so the first input is walked first.
            for &slot in inputs.iter().rev() {
                if let Some(upstream) = self.graph.edge_into(SlotRef::new(id, slot))
                    && !visited.contains(&upstream.node)
                {
                    stack.push((upstream.node, false));
                }
            }
        }

        Ok(())
    }

    /// Convenience wrapper returning a fresh list.
    pub fn collect_nodes(
        &self,
        root: NodeId,
        root_slots: Option<&[SlotId]>,
        keywords: Option<&KeywordSet>,
    ) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        self.collect(root, root_slots, keywords, &mut out)?;
        Ok(out)
    }
}

/// Keeps the slot ids present on `root`, in the given order. Absent ids are
/// skipped: passes are shared across graphs that may not expose every slot.
pub fn resolve_root_slots(graph: &MaterialGraph, root: NodeId, ids: &[u32]) -> Result<Vec<SlotId>> {
    let node = graph.try_node(root)?;
    let mut resolved = Vec::with_capacity(ids.len());
    for &raw in ids {
        let id = SlotId(raw);
        if node.slot(id).is_some() {
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        } else {
            log::trace!("Slot {} not present on '{}', skipped", raw, node.name());
        }
    }
    Ok(resolved)
}
