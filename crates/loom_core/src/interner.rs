//! Global String Interner
//!
//! Converts keyword and field names into compact integer [`Symbol`]s so that
//! keyword sets and active-field sets compare and hash as integers.
//! This is the foundation of the keyword variant system.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

/// Global interner instance.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer identifier for an interned string.
pub type Symbol = Spur;

/// Interns a string and returns its [`Symbol`].
///
/// Returns the existing symbol if the string was interned before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the symbol of an already interned string without allocating.
#[inline]
#[must_use]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
#[must_use]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the keyword and field names used by the built-in pass tables.
///
/// Optional; call once at startup to keep interning off the generation path.
pub fn preload_common_names() {
    let common = [
        // Keyword placeholder
        "_",
        // Engine keywords
        "UNITY_ANY_INSTANCING_ENABLED",
        "SHADER_STAGE_FRAGMENT",
        "DEBUG_DISPLAY",
        "LIGHTMAP_ON",
        "DIRLIGHTMAP_COMBINED",
        "DYNAMICLIGHTMAP_ON",
        "SHADOWS_SHADOWMASK",
        "WRITE_NORMAL_BUFFER",
        "WRITE_MSAA_DEPTH",
        // Feature fields
        "features.modifyMesh",
    ];

    for name in common {
        intern(name);
    }
}
