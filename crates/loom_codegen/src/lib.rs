//! Loom Codegen
//!
//! Turns a material graph and pass descriptors into shader pass source.
//!
//! # Overview
//!
//! - [`SchemaRegistry`]: struct schemas and field dependency tables ([`builtin`] holds the HD tables)
//! - [`ActiveFields`]: monotone field set and its dependency closure
//! - [`struct_builder`]: struct declarations against a closed field set
//! - [`TemplateSplicer`]: minijinja-based splicing of named fragments and built structs
//! - [`PassGenerator`]: the per-pass pipeline tying everything together

pub mod active_fields;
pub mod builtin;
pub mod generator;
pub mod graph_code;
pub mod pass;
pub mod render_state;
pub mod schema;
pub mod settings;
pub mod string_builder;
pub mod struct_builder;
pub mod template;

pub use active_fields::ActiveFields;
pub use generator::{GeneratedPass, MODIFY_MESH_FIELD, PassGenerator};
pub use graph_code::FunctionRegistry;
pub use pass::{PassDescriptor, RenderStateOverrides};
pub use render_state::{
    AlphaMode, BlendMode, CullMode, MaterialOptions, RenderStates, SurfaceType, ZClip, ZTest, ZWrite,
};
pub use schema::{
    Dependency, DependencyTable, FieldDescriptor, SchemaRegistry, SchemaRegistryBuilder, StructSchema,
};
pub use settings::GeneratorSettings;
pub use string_builder::ShaderStringBuilder;
pub use template::{
    BuiltinTemplates, DirectoryTemplateSource, MemoryTemplateSource, SpliceContext, SplicedTemplate,
    TemplateSource, TemplateSplicer,
};
