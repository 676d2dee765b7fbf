//! Struct Builder
//!
//! Emits a struct declaration for a [`StructSchema`] against a closed
//! [`ActiveFields`] set. A field is emitted when it is mandatory or active;
//! fields the schema does not declare are never emitted. Output follows
//! schema declaration order.

use crate::active_fields::ActiveFields;
use crate::schema::{FieldDescriptor, StructSchema};
use crate::string_builder::ShaderStringBuilder;

/// Whether `field` of `schema` is materialized under `active`.
#[must_use]
pub fn is_emitted(schema: &StructSchema, field: &FieldDescriptor, active: &ActiveFields) -> bool {
    !field.optional || active.contains(&schema.qualified(field))
}

/// Appends the declaration of `schema` to `sb`.
pub fn build_struct(schema: &StructSchema, active: &ActiveFields, sb: &mut ShaderStringBuilder) {
    sb.append_fmt(format_args!("struct {}", schema.name()));
    sb.append_line("{");
    sb.indent();
    for field in schema.fields() {
        if !is_emitted(schema, field, active) {
            continue;
        }
        if let Some(guard) = &field.guard {
            sb.append_fmt(format_args!("#if {guard}"));
        }
        match &field.semantic {
            Some(semantic) => sb.append_fmt(format_args!(
                "{} {} : {};",
                field.type_name(),
                field.name,
                semantic
            )),
            None => sb.append_fmt(format_args!("{} {};", field.type_name(), field.name)),
        }
        if field.guard.is_some() {
            sb.append_line("#endif");
        }
    }
    sb.deindent();
    sb.append_line("};");
}

/// Declaration of `schema` as a standalone string.
#[must_use]
pub fn struct_source(schema: &StructSchema, active: &ActiveFields) -> String {
    let mut sb = ShaderStringBuilder::new();
    build_struct(schema, active, &mut sb);
    sb.finish()
}
