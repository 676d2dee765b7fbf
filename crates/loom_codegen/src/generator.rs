//! Pass Generator
//!
//! Produces the source of one shader pass from a material graph, a
//! [`PassDescriptor`] and a pass template.
//!
//! # Pipeline
//!
//! ```text
//! Init → CollectVariants → ForEachVariant {
//!     CollectNodes → ComputeRequirements → PropagateDependencies → EmitStructs&Functions
//! } → CloseVariantBlock → AssembleNamedFragments → SpliceTemplate → Done
//! ```
//!
//! Every variant contributes one guarded branch to each per-variant section
//! (`#if` for the first, `#elif` for the following ones, `#else` for the
//! empty variant, which always comes last). A pass with a single variant
//! emits its sections unguarded.
//!
//! The [`ActiveFields`] set is shared across all variants of a pass and only
//! grows; it is handed back to the caller together with the source.
//!
//! A failure anywhere aborts the pass and nothing else: [`PassGenerator`]
//! holds no mutable state, so passes may be generated in any order or on
//! different threads.

use std::sync::Arc;

use loom_core::errors::Result;
use loom_core::keywords::KeywordSet;
use loom_graph::{
    GraphWalker, MaterialGraph, NodeId, NodesPerVariant, RequirementsPerVariant, ShaderStage,
    SlotId, SlotRef, VariantEnumerator, resolve_root_slots,
};
use rustc_hash::FxHashSet;
use xxhash_rust::xxh3::xxh3_128;

use crate::active_fields::ActiveFields;
use crate::graph_code::{
    FunctionRegistry, PIXEL_STAGE, VERTEX_STAGE, build_evaluation_function, build_output_struct,
};
use crate::pass::PassDescriptor;
use crate::render_state::{MaterialOptions, RenderStates};
use crate::schema::SchemaRegistry;
use crate::settings::GeneratorSettings;
use crate::string_builder::ShaderStringBuilder;
use crate::struct_builder::{build_struct, struct_source};
use crate::template::{SpliceContext, TemplateSource, TemplateSplicer};

/// Active field enabling mesh modification in the pass includes.
pub const MODIFY_MESH_FIELD: &str = "features.modifyMesh";

/// Output of one pass.
#[derive(Debug, Clone)]
pub struct GeneratedPass {
    pub pass_name: String,
    pub source: String,
    /// Variants in emission order, the empty variant last.
    pub variants: Vec<KeywordSet>,
    /// Final field set of the pass.
    pub active_fields: ActiveFields,
    /// Every template read while splicing.
    pub template_dependencies: Vec<String>,
    /// xxh3-128 of `source`.
    pub source_hash: u128,
}

/// Generates passes for one material graph.
pub struct PassGenerator<'g> {
    graph: &'g MaterialGraph,
    root: NodeId,
    registry: &'g SchemaRegistry,
    splicer: TemplateSplicer,
    settings: GeneratorSettings,
    material: MaterialOptions,
}

impl<'g> PassGenerator<'g> {
    /// Generator over `graph` rooted at the master node `root`, using the
    /// built-in HD schemas.
    pub fn new(graph: &'g MaterialGraph, root: NodeId, templates: Arc<dyn TemplateSource>) -> Self {
        Self {
            graph,
            root,
            registry: SchemaRegistry::builtin(),
            splicer: TemplateSplicer::new(templates),
            settings: GeneratorSettings::default(),
            material: MaterialOptions::default(),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: &'g SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: GeneratorSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_material_options(mut self, material: MaterialOptions) -> Self {
        self.material = material;
        self
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Generates each pass with its own field set. One result per pass, in
    /// order; a failing pass does not affect the others.
    pub fn generate_passes(&self, passes: &[PassDescriptor]) -> Vec<Result<GeneratedPass>> {
        passes
            .iter()
            .map(|pass| {
                let mut active = ActiveFields::new();
                let result = self.generate_pass(pass, &mut active);
                if let Err(e) = &result {
                    log::warn!("Pass '{}' failed: {e}", pass.name);
                }
                result
            })
            .collect()
    }

    /// Generates one pass. `active` may be pre-seeded; it receives every
    /// field the pass activates.
    pub fn generate_pass(
        &self,
        pass: &PassDescriptor,
        active: &mut ActiveFields,
    ) -> Result<GeneratedPass> {
        // ── Init ──
        let pixel_slots = resolve_root_slots(self.graph, self.root, &pass.pixel_slots)?;
        let vertex_slots = resolve_root_slots(self.graph, self.root, &pass.vertex_slots)?;
        let vertex_active = vertex_slots
            .iter()
            .any(|&slot| self.graph.is_connected(SlotRef::new(self.root, slot)));

        // ── CollectVariants ──
        let mut enumerator = VariantEnumerator::new(GraphWalker::new(self.graph))
            .with_limit(self.settings.max_variants);
        enumerator.collect_groups(self.root, &vertex_slots)?;
        enumerator.collect_groups(self.root, &pixel_slots)?;
        let variant_set = enumerator.enumerate(&pass.name)?;
        let variants = variant_set.ordered();
        let universe = variant_set.universe();

        let walker = enumerator.walker();
        let pixel_nodes = NodesPerVariant::build(walker, &variants, self.root, &pixel_slots)?;
        let vertex_nodes = NodesPerVariant::build(walker, &variants, self.root, &vertex_slots)?;
        let pixel_reqs = RequirementsPerVariant::from_nodes(self.graph, &pixel_nodes);
        let vertex_reqs = RequirementsPerVariant::from_nodes(self.graph, &vertex_nodes);
        let graph_reqs = pixel_reqs.union(&vertex_reqs);

        active.add_required(pass.required_fields.iter().map(String::as_str));

        // ── ForEachVariant ──
        let mut sections = VariantSections::default();
        let mut functions = FunctionRegistry::new();
        let guarded = variants.len() > 1;
        let empty: &[NodeId] = &[];

        for (i, variant) in variants.iter().enumerate() {
            if guarded {
                sections.open(variant_condition(i, variant, &universe).as_str());
            }

            // Pixel stage
            active.add_from_requirements(
                &pixel_reqs.get(variant),
                ShaderStage::Pixel,
                PIXEL_STAGE.input_struct,
            );
            build_output_struct(
                self.graph,
                self.root,
                &pixel_slots,
                PIXEL_STAGE,
                active,
                &mut sections.pixel_outputs,
            );
            let pixel = pixel_nodes.get(variant).unwrap_or(empty);
            build_evaluation_function(
                self.graph,
                self.root,
                pixel,
                &pixel_slots,
                variant,
                PIXEL_STAGE,
                &mut functions,
                &mut sections.pixel_eval,
            );

            // Vertex stage
            let vertex = vertex_nodes.get(variant).unwrap_or(empty);
            if vertex_active {
                active.insert(MODIFY_MESH_FIELD);
                active.add_from_requirements(
                    &vertex_reqs.get(variant),
                    ShaderStage::Vertex,
                    VERTEX_STAGE.input_struct,
                );
                build_output_struct(
                    self.graph,
                    self.root,
                    &vertex_slots,
                    VERTEX_STAGE,
                    active,
                    &mut sections.vertex_outputs,
                );
                build_evaluation_function(
                    self.graph,
                    self.root,
                    vertex,
                    &vertex_slots,
                    variant,
                    VERTEX_STAGE,
                    &mut functions,
                    &mut sections.vertex_eval,
                );
            }

            self.collect_properties(pixel, vertex, vertex_active, &mut sections.properties);

            // Propagate
            let scans = active.apply_registry(self.registry);
            log::debug!(
                "Pass '{}' variant {}: {} active fields after {} scans",
                pass.name,
                variant,
                active.len(),
                scans
            );
            if self.settings.debug_active_fields {
                sections.defines.append_line("// ACTIVE FIELDS:");
                for field in active.sorted() {
                    sections.defines.append_fmt(format_args!("//   {field}"));
                }
            }

            // Graph input structs
            if let Some(schema) = self.registry.get(PIXEL_STAGE.input_struct) {
                build_struct(schema, active, &mut sections.pixel_inputs);
            }
            if let Some(schema) = self.registry.get(VERTEX_STAGE.input_struct) {
                build_struct(schema, active, &mut sections.vertex_inputs);
            }

            // Defines
            let reqs = graph_reqs.get(variant);
            sections
                .defines
                .append_fmt(format_args!("#define SHADERPASS {}", pass.shader_pass_name));
            for define in &pass.extra_defines {
                sections.defines.append_line(define);
            }
            if reqs.depth_texture {
                sections.defines.append_line("#define REQUIRE_DEPTH_TEXTURE");
            }
            if reqs.opaque_texture {
                sections.defines.append_line("#define REQUIRE_OPAQUE_TEXTURE");
            }
        }

        // ── CloseVariantBlock ──
        if guarded {
            sections.close();
        }

        // ── AssembleNamedFragments ──
        let mut context = SpliceContext::new(pass.name.clone(), active.clone());
        let mut instancing = ShaderStringBuilder::new();
        instancing.append_line("#pragma multi_compile_instancing");
        for option in &pass.extra_instancing_options {
            instancing.append_line(option);
        }
        context.add_fragment("InstancingOptions", instancing.finish());

        let keywords: Vec<String> = enumerator.groups().iter().map(|g| g.pragma()).collect();
        context.add_fragment("Keywords", keywords.join("\n"));
        context.add_fragment("Graph", sections.graph_fragment(vertex_active, &functions));
        context.add_fragment("Defines", sections.defines.finish());
        context.add_fragment("LightMode", pass.light_mode.clone());
        context.add_fragment("PassName", pass.name.clone());
        context.add_fragment("Includes", pass.includes.join("\n"));

        let states = RenderStates::resolve(&pass.overrides, &self.material);
        context.add_fragment("Blending", states.blending);
        context.add_fragment("Culling", states.culling);
        context.add_fragment("ZTest", states.ztest);
        context.add_fragment("ZWrite", states.zwrite);
        context.add_fragment("ZClip", states.zclip);
        context.add_fragment("Stencil", states.stencil);
        context.add_fragment("ColorMask", states.color_mask);
        context.add_fragment("LOD", states.lod);

        for schema in self.registry.structs() {
            context.add_struct(schema.name(), struct_source(schema, active));
        }

        // ── SpliceTemplate ──
        let spliced = self.splicer.splice(&pass.name, &pass.template, context)?;
        let source = if self.settings.header_comment {
            format!(
                "// === Auto-generated by Loom: pass {} ===\n{}",
                pass.name, spliced.source
            )
        } else {
            spliced.source
        };

        Ok(GeneratedPass {
            pass_name: pass.name.clone(),
            source_hash: xxh3_128(source.as_bytes()),
            source,
            variants,
            active_fields: active.clone(),
            template_dependencies: spliced.dependencies,
        })
    }

    /// Property declarations of the active nodes of one variant, deduplicated.
    fn collect_properties(
        &self,
        pixel: &[NodeId],
        vertex: &[NodeId],
        vertex_active: bool,
        sb: &mut ShaderStringBuilder,
    ) {
        let vertex = if vertex_active { vertex } else { &[] };
        let mut seen = FxHashSet::default();
        for id in pixel.iter().chain(vertex) {
            let Some(node) = self.graph.node(*id) else {
                continue;
            };
            for property in node.properties() {
                if seen.insert(property.as_str()) {
                    sb.append_line(property);
                }
            }
        }
    }
}

/// Preprocessor line opening the branch of the `index`-th variant.
fn variant_condition(index: usize, variant: &KeywordSet, universe: &KeywordSet) -> String {
    if variant.is_empty() {
        return "#else".to_string();
    }
    let expr = variant.guard_expression(universe).unwrap_or_default();
    if index == 0 {
        format!("#if {expr}")
    } else {
        format!("#elif {expr}")
    }
}

/// Builders receiving per-variant output.
#[derive(Default)]
struct VariantSections {
    properties: ShaderStringBuilder,
    vertex_inputs: ShaderStringBuilder,
    vertex_outputs: ShaderStringBuilder,
    pixel_inputs: ShaderStringBuilder,
    pixel_outputs: ShaderStringBuilder,
    vertex_eval: ShaderStringBuilder,
    pixel_eval: ShaderStringBuilder,
    defines: ShaderStringBuilder,
}

impl VariantSections {
    fn each(&mut self) -> [&mut ShaderStringBuilder; 8] {
        [
            &mut self.properties,
            &mut self.vertex_inputs,
            &mut self.vertex_outputs,
            &mut self.pixel_inputs,
            &mut self.pixel_outputs,
            &mut self.vertex_eval,
            &mut self.pixel_eval,
            &mut self.defines,
        ]
    }

    fn open(&mut self, condition: &str) {
        for sb in self.each() {
            sb.append_line(condition);
        }
    }

    fn close(&mut self) {
        for sb in self.each() {
            sb.append_line("#endif");
        }
    }

    fn graph_fragment(&self, vertex_active: bool, functions: &FunctionRegistry) -> String {
        let mut graph = ShaderStringBuilder::new();
        graph.append_line("// Shared Graph Properties (uniform inputs)");
        graph.append_raw(self.properties.as_str());

        if vertex_active {
            graph.append_line("// Vertex Graph Inputs");
            graph.append_raw(self.vertex_inputs.as_str());
            graph.append_line("// Vertex Graph Outputs");
            graph.append_raw(self.vertex_outputs.as_str());
        }

        graph.append_line("// Pixel Graph Inputs");
        graph.append_raw(self.pixel_inputs.as_str());
        graph.append_line("// Pixel Graph Outputs");
        graph.append_raw(self.pixel_outputs.as_str());

        graph.append_line("// Shared Graph Node Functions");
        graph.append_raw(functions.as_str());

        if vertex_active {
            graph.append_line("// Vertex Graph Evaluation");
            graph.append_raw(self.vertex_eval.as_str());
        }

        graph.append_line("// Pixel Graph Evaluation");
        graph.append_raw(self.pixel_eval.as_str());
        graph.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MemoryTemplateSource;
    use loom_graph::{KeywordBranch, Node, Requirements, ValueType};

    const TEMPLATE: &str = "{{ pass.splice(\"Keywords\") }}\n{{ pass.splice(\"Defines\") }}\n{{ pass.splice(\"Graph\") }}\n";

    fn templates() -> Arc<dyn TemplateSource> {
        Arc::new(MemoryTemplateSource::new().with_template("t", TEMPLATE))
    }

    fn pass() -> PassDescriptor {
        PassDescriptor::new("Forward", "t")
            .with_shader_pass("SHADERPASS_FORWARD")
            .with_pixel_slots([0])
            .with_vertex_slots([1])
    }

    #[test]
    fn test_variant_condition() {
        let universe: KeywordSet = ["A", "B"].into_iter().collect();
        let a: KeywordSet = ["A"].into_iter().collect();
        assert_eq!(variant_condition(0, &a, &universe), "#if defined(A) && !defined(B)");
        assert_eq!(variant_condition(1, &universe, &universe), "#elif defined(A) && defined(B)");
        assert_eq!(variant_condition(2, &KeywordSet::new(), &universe), "#else");
    }

    #[test]
    fn test_keyword_switch_produces_guarded_sections() {
        let mut graph = MaterialGraph::new();
        let depth = graph.add_node(
            Node::new("SceneDepth")
                .with_output(0, "Out", ValueType::Float)
                .with_requirements(Requirements::none().with_depth_texture())
                .with_code("$Out = 1;"),
        );
        let switch = graph.add_node(
            Node::new("Switch")
                .with_input(0, "Off", ValueType::Float)
                .with_input(1, "On", ValueType::Float)
                .with_output(2, "Out", ValueType::Float)
                .with_keyword_branch(KeywordBranch::new().with_group([("_", SlotId(0)), ("USE_DEPTH", SlotId(1))])),
        );
        let master = graph.add_node(
            Node::new("Master")
                .with_input(0, "Alpha", ValueType::Float)
                .with_input(1, "Position", ValueType::Float3),
        );
        graph.link(depth, 0, switch, 1).unwrap();
        graph.link(switch, 2, master, 0).unwrap();

        let generator = PassGenerator::new(&graph, master, templates())
            .with_settings(GeneratorSettings::default().with_header_comment(false));
        let mut active = ActiveFields::new();
        let out = generator.generate_pass(&pass(), &mut active).unwrap();

        assert_eq!(out.variants.len(), 2);
        assert!(out.variants.last().unwrap().is_empty());
        assert!(out.source.starts_with("#pragma multi_compile _ USE_DEPTH\n"));

        let defines = "#if defined(USE_DEPTH)\n#define SHADERPASS SHADERPASS_FORWARD\n#define REQUIRE_DEPTH_TEXTURE\n#else\n#define SHADERPASS SHADERPASS_FORWARD\n#endif\n";
        assert!(out.source.contains(defines));
        // Nothing feeds the vertex slot.
        assert!(!out.source.contains("VertexDescriptionFunction"));
        assert!(!active.contains(MODIFY_MESH_FIELD));
        assert!(active.contains("SurfaceDescription.Alpha"));
        assert_eq!(out.source_hash, xxh3_128(out.source.as_bytes()));
    }

    #[test]
    fn test_connected_vertex_slot_activates_vertex_stage() {
        let mut graph = MaterialGraph::new();
        let position = graph.add_node(
            Node::new("Position")
                .with_output(0, "Out", ValueType::Float3)
                .with_requirements(Requirements::none().with_position(loom_graph::NeededSpace::OBJECT))
                .with_code("$Out = IN.ObjectSpacePosition;"),
        );
        let master = graph.add_node(
            Node::new("Master")
                .with_input(0, "Alpha", ValueType::Float)
                .with_input(1, "Position", ValueType::Float3),
        );
        graph.link(position, 0, master, 1).unwrap();

        let generator = PassGenerator::new(&graph, master, templates());
        let mut active = ActiveFields::new();
        let out = generator.generate_pass(&pass(), &mut active).unwrap();

        assert!(out.source.starts_with("// === Auto-generated by Loom: pass Forward ==="));
        assert!(out.source.contains("// Vertex Graph Evaluation\nVertexDescription VertexDescriptionFunction(VertexDescriptionInputs IN)"));
        assert!(active.contains(MODIFY_MESH_FIELD));
        assert!(active.contains("VertexDescriptionInputs.ObjectSpacePosition"));
        assert!(active.contains("AttributesMesh.positionOS"));
        // Single variant: no guards.
        assert!(!out.source.contains("#if"));
        assert!(!out.source.contains("#endif"));
    }

    #[test]
    fn test_preseeded_fields_survive() {
        let mut graph = MaterialGraph::new();
        let master = graph.add_node(Node::new("Master").with_input(0, "Alpha", ValueType::Float));
        let generator = PassGenerator::new(&graph, master, templates());

        let mut active = ActiveFields::new();
        active.insert("SurfaceDescriptionInputs.uv2");
        generator.generate_pass(&pass(), &mut active).unwrap();
        assert!(active.contains("SurfaceDescriptionInputs.uv2"));
        assert!(active.contains("FragInputs.texCoord2"));
    }
}
