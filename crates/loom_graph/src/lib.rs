//! Loom Graph
//!
//! Material node graph and the keyword-variant analysis that runs over it.
//!
//! # Overview
//!
//! - [`MaterialGraph`]: arena of [`Node`]s connected output → input
//! - [`GraphWalker`]: post-order depth-first collection with slot and keyword gating
//! - [`VariantEnumerator`]: cartesian product of the keyword groups declared by reachable nodes
//! - [`NodesPerVariant`] / [`RequirementsPerVariant`]: per-variant active nodes and data needs

pub mod graph;
pub mod index;
pub mod node;
pub mod requirements;
pub mod variants;
pub mod walker;

pub use graph::MaterialGraph;
pub use index::{NodesPerVariant, RequirementsPerVariant};
pub use node::{
    KeywordBranch, Node, NodeFunction, NodeId, Slot, SlotDirection, SlotId, SlotRef, ValueType,
};
pub use requirements::{NeededSpace, Requirements, ShaderStage, UvChannels};
pub use variants::{DEFAULT_MAX_VARIANTS, VariantEnumerator, VariantSet};
pub use walker::{GraphWalker, resolve_root_slots};
