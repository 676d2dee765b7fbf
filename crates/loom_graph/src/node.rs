//! Material Nodes
//!
//! A [`Node`] is a unit of generated code: typed input/output slots, the data
//! [`Requirements`] it imposes on its stage, a code snippet and optional shared
//! functions and property declarations.
//!
//! # Keyword Capability
//!
//! Nodes that switch between inputs depending on keywords carry a
//! [`KeywordBranch`]. The capability is queried with [`Node::keyword_branch`];
//! plain nodes return `None` and always expose every input slot.
//!
//! ```text
//! KeywordBranch
//!   group 0:  _ → In0 | FOO → In1
//!   group 1:  LOW → In2 | HIGH → In3
//!
//! active {FOO, HIGH}  ⇒  followed inputs: In1, In3 (+ any unrouted input)
//! ```

use std::fmt;

use loom_core::interner::{self, Symbol};
use loom_core::keywords::{self, KeywordGroup, KeywordSet};
use smallvec::SmallVec;

use crate::requirements::Requirements;

slotmap::new_key_type! {
    /// Identifier of a node inside a [`MaterialGraph`](crate::MaterialGraph).
    pub struct NodeId;
}

/// Identifier of a slot, unique within its node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A slot on a specific node. Edges are stored as pairs of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub node: NodeId,
    pub slot: SlotId,
}

impl SlotRef {
    #[inline]
    #[must_use]
    pub fn new(node: NodeId, slot: SlotId) -> Self {
        Self { node, slot }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotDirection {
    Input,
    Output,
}

/// Value type carried by a slot or a struct field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Float2,
    Float3,
    Float4,
    UInt,
    Bool,
}

impl ValueType {
    /// HLSL spelling of the type.
    #[must_use]
    pub fn hlsl_name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::UInt => "uint",
            Self::Bool => "bool",
        }
    }

    /// Literal used for an unconnected slot without an explicit default.
    #[must_use]
    pub fn zero_literal(self) -> &'static str {
        match self {
            Self::Float => "0",
            Self::Float2 => "float2(0, 0)",
            Self::Float3 => "float3(0, 0, 0)",
            Self::Float4 => "float4(0, 0, 0, 0)",
            Self::UInt => "0u",
            Self::Bool => "false",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Slot {
    pub id: SlotId,
    pub name: String,
    pub direction: SlotDirection,
    pub value_type: ValueType,
    pub default: Option<String>,
}

impl Slot {
    pub fn input(id: SlotId, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id,
            name: name.into(),
            direction: SlotDirection::Input,
            value_type,
            default: None,
        }
    }

    pub fn output(id: SlotId, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id,
            name: name.into(),
            direction: SlotDirection::Output,
            value_type,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    /// Literal used when nothing is connected to this slot.
    #[must_use]
    pub fn default_literal(&self) -> &str {
        self.default
            .as_deref()
            .unwrap_or_else(|| self.value_type.zero_literal())
    }

    #[inline]
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.direction == SlotDirection::Input
    }
}

/// A shared helper function emitted once per pass, deduplicated by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeFunction {
    pub name: String,
    pub source: String,
}

// ─── Keyword Branch ──────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct BranchGroup {
    group: KeywordGroup,
    routes: SmallVec<[(Symbol, SlotId); 4]>,
}

impl BranchGroup {
    fn selected(&self, active: &KeywordSet) -> Option<SlotId> {
        self.routes
            .iter()
            .find(|(kw, _)| !keywords::is_default(*kw) && active.contains_symbol(*kw))
            .or_else(|| self.routes.iter().find(|(kw, _)| keywords::is_default(*kw)))
            .map(|&(_, slot)| slot)
    }

    fn routes_slot(&self, slot: SlotId) -> bool {
        self.routes.iter().any(|&(_, s)| s == slot)
    }
}

/// Keyword capability of a node: one or more mutually exclusive option
/// groups, each option routing to one input slot.
#[derive(Clone, Debug, Default)]
pub struct KeywordBranch {
    groups: SmallVec<[BranchGroup; 1]>,
}

impl KeywordBranch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group from `(option, input slot)` routes. Use `"_"` for the
    /// default route.
    #[must_use]
    pub fn with_group<'a, I>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, SlotId)>,
    {
        let routes: SmallVec<[(Symbol, SlotId); 4]> = routes
            .into_iter()
            .map(|(kw, slot)| (interner::intern(kw), slot))
            .collect();
        let group = routes.iter().map(|&(kw, _)| kw).collect();
        self.groups.push(BranchGroup { group, routes });
        self
    }

    /// Declared option groups.
    pub fn groups(&self) -> impl Iterator<Item = &KeywordGroup> + '_ {
        self.groups.iter().map(|g| &g.group)
    }

    /// Routed input of each group under `active`, in group order.
    pub fn selections<'a>(
        &'a self,
        active: &'a KeywordSet,
    ) -> impl Iterator<Item = Option<SlotId>> + 'a {
        self.groups.iter().map(move |g| g.selected(active))
    }

    /// Input slots of `node` followed under `active`: the routed input of
    /// every group plus every input no group routes. Node slot order.
    #[must_use]
    pub fn input_slots_for(&self, node: &Node, active: &KeywordSet) -> SmallVec<[SlotId; 8]> {
        let selected: SmallVec<[Option<SlotId>; 2]> = self.selections(active).collect();
        node.input_slots()
            .map(|slot| slot.id)
            .filter(|&id| {
                let routed_by: SmallVec<[usize; 2]> = self
                    .groups
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| g.routes_slot(id))
                    .map(|(i, _)| i)
                    .collect();
                routed_by.is_empty() || routed_by.iter().any(|&i| selected[i] == Some(id))
            })
            .collect()
    }
}

// ─── Node ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    pub(crate) serial: u32,
    slots: SmallVec<[Slot; 4]>,
    requirements: Requirements,
    code: Option<String>,
    functions: Vec<NodeFunction>,
    properties: Vec<String>,
    keyword_branch: Option<KeywordBranch>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serial: 0,
            slots: SmallVec::new(),
            requirements: Requirements::default(),
            code: None,
            functions: Vec::new(),
            properties: Vec::new(),
            keyword_branch: None,
        }
    }

    /// Adds a slot. A slot with the same id is replaced.
    #[must_use]
    pub fn with_slot(mut self, slot: Slot) -> Self {
        if let Some(existing) = self.slots.iter_mut().find(|s| s.id == slot.id) {
            *existing = slot;
        } else {
            self.slots.push(slot);
        }
        self
    }

    #[must_use]
    pub fn with_input(self, id: u32, name: impl Into<String>, value_type: ValueType) -> Self {
        self.with_slot(Slot::input(SlotId(id), name, value_type))
    }

    #[must_use]
    pub fn with_output(self, id: u32, name: impl Into<String>, value_type: ValueType) -> Self {
        self.with_slot(Slot::output(SlotId(id), name, value_type))
    }

    #[must_use]
    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Sets the code snippet. `$Slot` placeholders name slots of this node.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.functions.push(NodeFunction {
            name: name.into(),
            source: source.into(),
        });
        self
    }

    /// Adds a uniform declaration line, e.g. `float4 _Tint;`.
    #[must_use]
    pub fn with_property(mut self, declaration: impl Into<String>) -> Self {
        self.properties.push(declaration.into());
        self
    }

    #[must_use]
    pub fn with_keyword_branch(mut self, branch: KeywordBranch) -> Self {
        self.keyword_branch = Some(branch);
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insertion serial inside the owning graph.
    #[inline]
    #[must_use]
    pub fn serial(&self) -> u32 {
        self.serial
    }

    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    #[must_use]
    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn input_slots(&self) -> impl Iterator<Item = &Slot> + '_ {
        self.slots.iter().filter(|s| s.is_input())
    }

    pub fn output_slots(&self) -> impl Iterator<Item = &Slot> + '_ {
        self.slots.iter().filter(|s| !s.is_input())
    }

    #[inline]
    #[must_use]
    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    #[inline]
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn functions(&self) -> &[NodeFunction] {
        &self.functions
    }

    #[inline]
    #[must_use]
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Keyword capability query.
    #[inline]
    #[must_use]
    pub fn keyword_branch(&self) -> Option<&KeywordBranch> {
        self.keyword_branch.as_ref()
    }

    /// Input slots followed when `active` is the current variant.
    #[must_use]
    pub fn input_slots_for(&self, active: &KeywordSet) -> SmallVec<[SlotId; 8]> {
        match &self.keyword_branch {
            Some(branch) => branch.input_slots_for(self, active),
            None => self.input_slots().map(|s| s.id).collect(),
        }
    }

    /// Generated variable holding the value of `slot`: `<node>_<serial>_<slot>`.
    #[must_use]
    pub fn variable_name(&self, slot: &Slot) -> String {
        format!(
            "{}_{}_{}",
            sanitize_identifier(&self.name),
            self.serial,
            sanitize_identifier(&slot.name)
        )
    }
}

/// Replaces every character that cannot appear in an identifier with `_`.
#[must_use]
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
