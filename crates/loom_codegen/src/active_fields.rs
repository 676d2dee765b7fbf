//! Active Field Closure
//!
//! [`ActiveFields`] is the set of qualified field names (`Struct.field`) a
//! pass must materialize. It is seeded from node requirements and pass
//! mandatory fields, then closed over the registry's dependency edges.
//!
//! The set only grows: nothing in this module removes a member. Closure is a
//! repeated scan over all edges until a scan activates nothing. Each
//! productive scan activates at least one producer and every producer is
//! named by some edge, so at most `|edges|` scans activate anything; one more
//! confirms the fixed point. This holds for cyclic tables too.

use loom_core::interner::{self, Symbol};
use loom_graph::{Requirements, ShaderStage};
use rustc_hash::FxHashSet;

use crate::schema::{Dependency, SchemaRegistry};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveFields {
    fields: FxHashSet<Symbol>,
}

impl ActiveFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates `field`. Returns `false` when it was already active.
    pub fn insert(&mut self, field: &str) -> bool {
        self.fields.insert(interner::intern(field))
    }

    #[inline]
    pub fn insert_symbol(&mut self, field: Symbol) -> bool {
        self.fields.insert(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        interner::get(field).is_some_and(|s| self.fields.contains(&s))
    }

    #[inline]
    #[must_use]
    pub fn contains_symbol(&self, field: Symbol) -> bool {
        self.fields.contains(&field)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Member names sorted lexicographically.
    #[must_use]
    pub fn sorted(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.fields.iter().map(|&s| interner::resolve(s)).collect();
        names.sort_unstable();
        names
    }

    pub fn add_required<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) {
        for field in fields {
            self.insert(field);
        }
    }

    /// Activates the canonical fields of `requirements` on `struct_name`.
    pub fn add_from_requirements(
        &mut self,
        requirements: &Requirements,
        stage: ShaderStage,
        struct_name: &str,
    ) {
        requirements.for_each_field(stage, |field| {
            self.insert(&format!("{struct_name}.{field}"));
        });
    }

    /// Closes the set over `edges`. Returns the number of full scans performed,
    /// including the final confirming scan that activates nothing: the result
    /// minus one never exceeds `edges.len()`.
    pub fn apply_dependencies(&mut self, edges: &[Dependency]) -> usize {
        let mut scans = 0;
        loop {
            scans += 1;
            let mut changed = false;
            for dep in edges {
                if self.fields.contains(&dep.consumer) && self.fields.insert(dep.producer) {
                    log::trace!(
                        "Activated '{}' (needed by '{}')",
                        interner::resolve(dep.producer),
                        interner::resolve(dep.consumer)
                    );
                    changed = true;
                }
            }
            if !changed {
                return scans;
            }
        }
    }

    /// Closes the set over every table of `registry`.
    pub fn apply_registry(&mut self, registry: &SchemaRegistry) -> usize {
        self.apply_dependencies(registry.dependencies())
    }
}

impl<'a> Extend<&'a str> for ActiveFields {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        self.add_required(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_graph::{NeededSpace, UvChannels};

    #[test]
    fn test_world_position_pulls_frag_position() {
        let registry = SchemaRegistry::builtin();
        let mut active = ActiveFields::new();
        active.insert("SurfaceDescriptionInputs.WorldSpacePosition");
        active.apply_registry(registry);

        assert!(active.contains("FragInputs.positionRWS"));
        assert!(active.contains("VaryingsMeshToPS.positionRWS"));
        assert!(active.contains("AttributesMesh.positionOS"));
    }

    #[test]
    fn test_closure_is_idempotent() {
        let registry = SchemaRegistry::builtin();
        let mut active = ActiveFields::new();
        active.insert("SurfaceDescriptionInputs.TangentSpaceViewDirection");
        active.apply_registry(registry);
        let once = active.clone();

        assert_eq!(active.apply_registry(registry), 1);
        assert_eq!(active, once);
        assert!(!active.insert("FragInputs.worldToTangent"));
        assert_eq!(active, once);
    }

    #[test]
    fn test_scan_count_is_bounded_by_chain_length() {
        // Edges listed against the propagation direction: one field per scan.
        let edges = [
            Dependency::new("C.c", "D.d"),
            Dependency::new("B.b", "C.c"),
            Dependency::new("A.a", "B.b"),
        ];
        let mut active = ActiveFields::new();
        active.insert("A.a");
        let scans = active.apply_dependencies(&edges);
        assert_eq!(scans, 4);
        // Three productive scans, one per edge, then the confirming one.
        assert_eq!(scans - 1, edges.len());
        assert_eq!(active.sorted(), vec!["A.a", "B.b", "C.c", "D.d"]);
    }

    #[test]
    fn test_cyclic_edges_still_terminate() {
        let edges = [Dependency::new("X.a", "X.b"), Dependency::new("X.b", "X.a")];
        let mut active = ActiveFields::new();
        active.insert("X.a");
        assert!(active.apply_dependencies(&edges) <= 3);
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn test_requirements_translate_to_struct_fields() {
        let req = Requirements::none()
            .with_normal(NeededSpace::WORLD | NeededSpace::TANGENT)
            .with_uv(UvChannels::UV1)
            .with_face_sign();

        let mut pixel = ActiveFields::new();
        pixel.add_from_requirements(&req, ShaderStage::Pixel, "SurfaceDescriptionInputs");
        assert_eq!(
            pixel.sorted(),
            vec![
                "SurfaceDescriptionInputs.FaceSign",
                "SurfaceDescriptionInputs.TangentSpaceNormal",
                "SurfaceDescriptionInputs.WorldSpaceNormal",
                "SurfaceDescriptionInputs.uv1",
            ]
        );

        let mut vertex = ActiveFields::new();
        vertex.add_from_requirements(&req, ShaderStage::Vertex, "VertexDescriptionInputs");
        assert!(!vertex.contains("VertexDescriptionInputs.FaceSign"));
        assert_eq!(vertex.len(), 3);
    }

    #[test]
    fn test_unknown_name_is_not_contained() {
        let active = ActiveFields::new();
        assert!(!active.contains("Never.Interned.Before"));
    }
}
