#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Loom
//!
//! Shader variant code generation: from a material node graph and a set of
//! pass templates to concrete shader pass source, one mutually exclusive
//! preprocessor branch per keyword combination.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use loom::{ActiveFields, BuiltinTemplates, PassGenerator, builtin};
//!
//! let generator = PassGenerator::new(&graph, master, Arc::new(BuiltinTemplates));
//! let pass = builtin::forward_pass(true, &[0, 1], &[2]);
//! let generated = generator.generate_pass(&pass, &mut ActiveFields::new())?;
//! ```

pub use loom_codegen as codegen;
pub use loom_graph as graph;

pub use loom_core::{errors, interner, keywords, scratch};
pub use loom_core::{DEFAULT_KEYWORD, KeywordGroup, KeywordSet, LoomError, Result, Symbol};

pub use loom_graph::{
    GraphWalker, KeywordBranch, MaterialGraph, NeededSpace, Node, NodeFunction, NodeId,
    NodesPerVariant, Requirements, RequirementsPerVariant, ShaderStage, Slot, SlotDirection,
    SlotId, SlotRef, UvChannels, ValueType, VariantEnumerator, VariantSet, resolve_root_slots,
};

pub use loom_codegen::builtin;
pub use loom_codegen::{
    ActiveFields, AlphaMode, BlendMode, BuiltinTemplates, CullMode, Dependency, DependencyTable,
    DirectoryTemplateSource, FieldDescriptor, GeneratedPass, GeneratorSettings, MaterialOptions,
    MemoryTemplateSource, PassDescriptor, PassGenerator, RenderStateOverrides, RenderStates,
    SchemaRegistry, StructSchema, SurfaceType, TemplateSource, TemplateSplicer, ZClip, ZTest,
    ZWrite,
};
