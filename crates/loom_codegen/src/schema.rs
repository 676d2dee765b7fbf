//! Struct Schemas & Dependency Tables
//!
//! Static description of the structs a pass can materialize: ordered fields
//! with semantic, type override, optional flag and preprocessor guard, plus
//! the consumer → producer field dependencies between them.
//!
//! A [`SchemaRegistry`] is read-only once built. Construction goes through
//! [`SchemaRegistryBuilder`], which rejects duplicate struct names and cyclic
//! dependency tables.

use std::fmt;

use loom_core::errors::{LoomError, Result};
use loom_core::interner::{self, Symbol};
use loom_graph::ValueType;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

// ─── Fields ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub value_type: ValueType,
    pub semantic: Option<String>,
    pub type_override: Option<String>,
    pub optional: bool,
    pub guard: Option<String>,
}

impl FieldDescriptor {
    /// A mandatory field without semantic or guard.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            semantic: None,
            type_override: None,
            optional: false,
            guard: None,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn semantic(mut self, semantic: impl Into<String>) -> Self {
        self.semantic = Some(semantic.into());
        self
    }

    #[must_use]
    pub fn override_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_override = Some(type_name.into());
        self
    }

    /// Wraps the member in `#if <condition>`.
    #[must_use]
    pub fn guarded(mut self, condition: impl Into<String>) -> Self {
        self.guard = Some(condition.into());
        self
    }

    /// Declared type spelling: the override when present.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.type_override
            .as_deref()
            .unwrap_or_else(|| self.value_type.hlsl_name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl StructSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field. Declaration order is emission order.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// `<Struct>.<field>`
    #[must_use]
    pub fn qualified(&self, field: &FieldDescriptor) -> String {
        format!("{}.{}", self.name, field.name)
    }
}

// ─── Dependencies ────────────────────────────────────────────────────────────

/// "If `consumer` is active, `producer` must be active."
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub consumer: Symbol,
    pub producer: Symbol,
}

impl Dependency {
    pub fn new(consumer: &str, producer: &str) -> Self {
        Self {
            consumer: interner::intern(consumer),
            producer: interner::intern(producer),
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            interner::resolve(self.consumer),
            interner::resolve(self.producer)
        )
    }
}

/// Dependency list declared for one consumer struct.
#[derive(Clone, Debug)]
pub struct DependencyTable {
    name: String,
    edges: Vec<Dependency>,
}

impl DependencyTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            edges: Vec::new(),
        }
    }

    /// Builds a table from `(consumer, producer)` pairs.
    pub fn from_pairs(name: impl Into<String>, pairs: &[(&str, &str)]) -> Self {
        Self {
            name: name.into(),
            edges: pairs.iter().map(|(c, p)| Dependency::new(c, p)).collect(),
        }
    }

    #[must_use]
    pub fn edge(mut self, consumer: &str, producer: &str) -> Self {
        self.edges.push(Dependency::new(consumer, producer));
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[Dependency] {
        &self.edges
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Read-only set of struct schemas and dependency tables.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    structs: Vec<StructSchema>,
    by_name: FxHashMap<String, usize>,
    tables: Vec<DependencyTable>,
    /// All table edges, in table order.
    edges: Vec<Dependency>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StructSchema> {
        self.by_name.get(name).map(|&i| &self.structs[i])
    }

    /// Schemas in registration order.
    #[inline]
    #[must_use]
    pub fn structs(&self) -> &[StructSchema] {
        &self.structs
    }

    #[inline]
    #[must_use]
    pub fn tables(&self) -> &[DependencyTable] {
        &self.tables
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&DependencyTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Every dependency edge of every table.
    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.edges
    }
}

#[derive(Default)]
pub struct SchemaRegistryBuilder {
    structs: Vec<StructSchema>,
    tables: Vec<DependencyTable>,
}

impl SchemaRegistryBuilder {
    #[must_use]
    pub fn with_struct(mut self, schema: StructSchema) -> Self {
        self.structs.push(schema);
        self
    }

    #[must_use]
    pub fn with_dependencies(mut self, table: DependencyTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn build(self) -> Result<SchemaRegistry> {
        let mut seen = FxHashSet::default();
        for schema in &self.structs {
            if !seen.insert(schema.name.as_str()) {
                return Err(LoomError::DuplicateStruct(schema.name.clone()));
            }
        }

        let registry = self.assemble();
        if let Some(field) = find_cycle(&registry.edges) {
            return Err(LoomError::CyclicDependency {
                field: interner::resolve(field).to_string(),
            });
        }
        Ok(registry)
    }

    /// Builds without validation. Only for tables whose validity a test
    /// asserts through [`build`](Self::build).
    pub(crate) fn assemble(self) -> SchemaRegistry {
        let by_name = self
            .structs
            .iter()
            .enumerate()
            .map(|(i, schema)| (schema.name.clone(), i))
            .collect();
        let edges = self
            .tables
            .iter()
            .flat_map(|t| t.edges.iter().copied())
            .collect();
        SchemaRegistry {
            structs: self.structs,
            by_name,
            tables: self.tables,
            edges,
        }
    }
}

/// Returns a field lying on a cycle of the dependency graph, if any.
fn find_cycle(edges: &[Dependency]) -> Option<Symbol> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Open,
        Done,
    }

    let mut adjacency: FxHashMap<Symbol, SmallVec<[Symbol; 4]>> = FxHashMap::default();
    for dep in edges {
        adjacency.entry(dep.consumer).or_default().push(dep.producer);
    }

    let mut marks: FxHashMap<Symbol, Mark> = FxHashMap::default();
    let mut roots: Vec<Symbol> = edges.iter().map(|d| d.consumer).collect();
    let mut dedup = FxHashSet::default();
    roots.retain(|s| dedup.insert(*s));

    for root in roots {
        if marks.contains_key(&root) {
            continue;
        }
        // (field, next child index)
        let mut stack: Vec<(Symbol, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::Open);

        while let Some(top) = stack.last_mut() {
            let (field, next) = *top;
            top.1 += 1;
            let children = adjacency.get(&field).map_or(&[][..], |c| c.as_slice());
            if let Some(&child) = children.get(next) {
                match marks.get(&child) {
                    Some(Mark::Open) => return Some(child),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::Open);
                        stack.push((child, 0));
                    }
                }
            } else {
                marks.insert(field, Mark::Done);
                stack.pop();
            }
        }
    }
    None
}
