//! Graph Code Emission
//!
//! Turns the active nodes of one variant into HLSL: the graph output struct
//! of a stage, the stage evaluation function and the shared helper functions
//! the nodes declare.
//!
//! Node code uses `$Slot` placeholders. An input placeholder expands to the
//! variable of the upstream output it is connected to, or to the slot's
//! default literal; an output placeholder expands to the node's own variable
//! (`<node>_<serial>_<slot>`). Slots are referenced by their sanitized name,
//! so input `Base Color` is written `$Base_Color`.

use loom_core::keywords::KeywordSet;
use loom_graph::{MaterialGraph, Node, NodeFunction, NodeId, SlotId, SlotRef, node::sanitize_identifier};
use rustc_hash::FxHashSet;

use crate::active_fields::ActiveFields;
use crate::string_builder::ShaderStringBuilder;

/// Names of the generated types and function of one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageNames {
    pub output_struct: &'static str,
    pub function: &'static str,
    pub input_struct: &'static str,
    pub result: &'static str,
}

pub const PIXEL_STAGE: StageNames = StageNames {
    output_struct: "SurfaceDescription",
    function: "SurfaceDescriptionFunction",
    input_struct: "SurfaceDescriptionInputs",
    result: "surface",
};

pub const VERTEX_STAGE: StageNames = StageNames {
    output_struct: "VertexDescription",
    function: "VertexDescriptionFunction",
    input_struct: "VertexDescriptionInputs",
    result: "description",
};

// ─── Function Registry ───────────────────────────────────────────────────────

/// Shared node functions, emitted once per pass in first-seen order.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    names: FxHashSet<String>,
    sb: ShaderStringBuilder,
}

impl FunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `function` unless a function of the same name was added before.
    pub fn provide(&mut self, function: &NodeFunction) -> bool {
        if !self.names.insert(function.name.clone()) {
            return false;
        }
        self.sb.append_lines(&function.source);
        self.sb.blank();
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.sb.as_str()
    }
}

// ─── Output Struct ───────────────────────────────────────────────────────────

/// Declares the stage output struct, one member per root slot, and activates
/// `<OutputStruct>.<member>` for each.
pub fn build_output_struct(
    graph: &MaterialGraph,
    root: NodeId,
    slots: &[SlotId],
    stage: StageNames,
    active: &mut ActiveFields,
    sb: &mut ShaderStringBuilder,
) {
    sb.append_fmt(format_args!("struct {}", stage.output_struct));
    sb.append_line("{");
    sb.indent();
    if let Some(node) = graph.node(root) {
        for slot in slots.iter().filter_map(|&id| node.slot(id)) {
            let member = sanitize_identifier(&slot.name);
            sb.append_fmt(format_args!("{} {};", slot.value_type.hlsl_name(), member));
            active.insert(&format!("{}.{}", stage.output_struct, member));
        }
    }
    sb.deindent();
    sb.append_line("};");
}

// ─── Evaluation Function ─────────────────────────────────────────────────────

/// Expression feeding input `slot` of `node`.
fn input_expression(graph: &MaterialGraph, id: NodeId, node: &Node, slot: SlotId) -> String {
    if let Some(upstream) = graph.edge_into(SlotRef::new(id, slot))
        && let Some(source) = graph.node(upstream.node)
        && let Some(out) = source.slot(upstream.slot)
    {
        return source.variable_name(out);
    }
    node.slot(slot)
        .map(|s| s.default_literal().to_string())
        .unwrap_or_default()
}

/// Expands `$Slot` placeholders of `code`. Unknown names are kept verbatim.
#[must_use]
pub fn expand_placeholders(graph: &MaterialGraph, id: NodeId, node: &Node, code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let len = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(tail.len());
        let name = &tail[..len];

        let slot = (!name.is_empty())
            .then(|| node.slots().iter().find(|s| sanitize_identifier(&s.name) == name))
            .flatten();
        match slot {
            Some(slot) if slot.is_input() => out.push_str(&input_expression(graph, id, node, slot.id)),
            Some(slot) => out.push_str(&node.variable_name(slot)),
            None => {
                out.push('$');
                out.push_str(name);
            }
        }
        rest = &tail[len..];
    }
    out.push_str(rest);
    out
}

/// Body lines of one node under `variant`.
fn emit_node(
    graph: &MaterialGraph,
    id: NodeId,
    node: &Node,
    variant: &KeywordSet,
    sb: &mut ShaderStringBuilder,
) {
    for out in node.output_slots() {
        sb.append_fmt(format_args!("{} {};", out.value_type.hlsl_name(), node.variable_name(out)));
    }

    if let Some(code) = node.code() {
        sb.append_lines(&expand_placeholders(graph, id, node, code));
        return;
    }

    // Without code, outputs take the routed input of the first group.
    let routed = node
        .keyword_branch()
        .and_then(|branch| branch.selections(variant).next().flatten());
    for out in node.output_slots() {
        let value = match routed {
            Some(input) => input_expression(graph, id, node, input),
            None => out.default_literal().to_string(),
        };
        sb.append_fmt(format_args!("{} = {};", node.variable_name(out), value));
    }
}

/// Emits the evaluation function of a stage for the active `nodes` (inputs
/// first, root last) and registers their shared functions.
pub fn build_evaluation_function(
    graph: &MaterialGraph,
    root: NodeId,
    nodes: &[NodeId],
    slots: &[SlotId],
    variant: &KeywordSet,
    stage: StageNames,
    functions: &mut FunctionRegistry,
    sb: &mut ShaderStringBuilder,
) {
    sb.append_fmt(format_args!(
        "{} {}({} IN)",
        stage.output_struct, stage.function, stage.input_struct
    ));
    sb.append_line("{");
    sb.indent();

    for &id in nodes {
        let Some(node) = graph.node(id) else {
            continue;
        };
        for function in node.functions() {
            functions.provide(function);
        }
        if id != root {
            emit_node(graph, id, node, variant, sb);
        }
    }

    sb.append_fmt(format_args!(
        "{} {} = ({})0;",
        stage.output_struct, stage.result, stage.output_struct
    ));
    if let Some(node) = graph.node(root) {
        for slot in slots.iter().filter_map(|&s| node.slot(s)) {
            sb.append_fmt(format_args!(
                "{}.{} = {};",
                stage.result,
                sanitize_identifier(&slot.name),
                input_expression(graph, root, node, slot.id)
            ));
        }
    }
    sb.append_fmt(format_args!("return {};", stage.result));
    sb.deindent();
    sb.append_line("}");
}
