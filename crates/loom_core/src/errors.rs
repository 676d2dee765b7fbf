//! Error Types
//!
//! This module defines the error types shared by all Loom crates.
//!
//! # Overview
//!
//! The main error type [`LoomError`] covers every failure mode of pass
//! generation. All of them are *pass-scoped*: a failing pass never aborts the
//! generation of its siblings, the caller decides whether to report, skip or
//! abort the whole material.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, LoomError>`.
//!
//! ```rust,ignore
//! use loom::errors::{LoomError, Result};
//!
//! fn generate() -> Result<String> {
//!     Err(LoomError::TemplateNotFound {
//!         pass: "Forward".into(),
//!         template: "Lit/ForwardPass.template".into(),
//!     })
//! }
//! ```

use thiserror::Error;

/// The main error type for Loom.
#[derive(Error, Debug)]
pub enum LoomError {
    // ========================================================================
    // Template Errors
    // ========================================================================
    /// The template path referenced by a pass does not resolve.
    #[error("Template not found for pass '{pass}': {template}")]
    TemplateNotFound {
        /// Name of the pass being generated
        pass: String,
        /// The unresolved template path
        template: String,
    },

    /// The template references an unknown fragment or struct type, or does
    /// not parse.
    #[error("Malformed template directive in pass '{pass}': {detail}")]
    MalformedDirective {
        /// Name of the pass being generated
        pass: String,
        /// Description of the offending directive
        detail: String,
    },

    /// The template collaborator failed while reading a template.
    #[error("Failed to read template '{template}': {source}")]
    TemplateSource {
        /// The template path being read
        template: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    // ========================================================================
    // Schema & Propagation Errors
    // ========================================================================
    /// A dependency table contains a cycle through the given field.
    #[error("Cyclic field dependency through '{field}'")]
    CyclicDependency {
        /// A field that lies on the cycle
        field: String,
    },

    /// Two schemas were registered under the same struct name.
    #[error("Duplicate struct schema: {0}")]
    DuplicateStruct(String),

    // ========================================================================
    // Variant Errors
    // ========================================================================
    /// The keyword groups of a pass would produce more variants than allowed.
    #[error("Pass '{pass}' would generate {count} variants (limit {limit})")]
    VariantLimitExceeded {
        /// Name of the pass being generated
        pass: String,
        /// Size of the cartesian product (saturated)
        count: usize,
        /// Configured limit
        limit: usize,
    },

    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// A node id does not refer to a node of the graph.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// An edge references a missing slot or connects slots of the wrong direction.
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),
}

impl LoomError {
    /// Returns the pass name for pass-scoped template and variant errors.
    #[must_use]
    pub fn pass_name(&self) -> Option<&str> {
        match self {
            Self::TemplateNotFound { pass, .. }
            | Self::MalformedDirective { pass, .. }
            | Self::VariantLimitExceeded { pass, .. } => Some(pass),
            _ => None,
        }
    }
}

/// Alias for `Result<T, LoomError>`.
pub type Result<T> = std::result::Result<T, LoomError>;
