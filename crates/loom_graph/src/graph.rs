//! Material Graph
//!
//! Arena of [`Node`]s addressed by [`NodeId`]. Edges run from an output slot
//! to an input slot and are stored keyed by the input side: an input has at
//! most one incoming edge, an output may feed any number of inputs.
//!
//! Nodes never own each other; traversal goes through the arena, so cycles in
//! ownership cannot arise.

use loom_core::errors::{LoomError, Result};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::node::{Node, NodeId, SlotDirection, SlotId, SlotRef};

#[derive(Debug, Default, Clone)]
pub struct MaterialGraph {
    nodes: SlotMap<NodeId, Node>,
    /// input slot → output slot feeding it
    edges: FxHashMap<SlotRef, SlotRef>,
    next_serial: u32,
}

impl MaterialGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        node.serial = self.next_serial;
        self.next_serial += 1;
        self.nodes.insert(node)
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        self.edges
            .retain(|input, output| input.node != id && output.node != id);
        Some(node)
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Like [`node`](Self::node) but reports a missing id as an error.
    pub fn try_node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| LoomError::UnknownNode(format!("{id:?}")))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Connects an output slot to an input slot, replacing any edge already
    /// feeding that input.
    pub fn connect(&mut self, from: SlotRef, to: SlotRef) -> Result<()> {
        self.check_slot(from, SlotDirection::Output)?;
        self.check_slot(to, SlotDirection::Input)?;
        if from.node == to.node {
            return Err(LoomError::InvalidConnection(format!(
                "{:?} cannot feed itself",
                from.node
            )));
        }
        self.edges.insert(to, from);
        Ok(())
    }

    /// Shorthand for [`connect`](Self::connect) with raw slot ids.
    pub fn link(&mut self, from: NodeId, output: u32, to: NodeId, input: u32) -> Result<()> {
        self.connect(
            SlotRef::new(from, SlotId(output)),
            SlotRef::new(to, SlotId(input)),
        )
    }

    pub fn disconnect(&mut self, input: SlotRef) -> Option<SlotRef> {
        self.edges.remove(&input)
    }

    /// The output slot feeding `input`, if connected.
    #[inline]
    #[must_use]
    pub fn edge_into(&self, input: SlotRef) -> Option<SlotRef> {
        self.edges.get(&input).copied()
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self, input: SlotRef) -> bool {
        self.edges.contains_key(&input)
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn check_slot(&self, slot_ref: SlotRef, direction: SlotDirection) -> Result<()> {
        let node = self.try_node(slot_ref.node)?;
        match node.slot(slot_ref.slot) {
            Some(slot) if slot.direction == direction => Ok(()),
            Some(_) => Err(LoomError::InvalidConnection(format!(
                "slot {} on '{}' is not an {} slot",
                slot_ref.slot,
                node.name(),
                match direction {
                    SlotDirection::Input => "input",
                    SlotDirection::Output => "output",
                }
            ))),
            None => Err(LoomError::InvalidConnection(format!(
                "node '{}' has no slot {}",
                node.name(),
                slot_ref.slot
            ))),
        }
    }
}
