//! Keyword Sets & Keyword Groups
//!
//! A *variant* of a generated pass is identified by the set of keywords that
//! are defined when it is compiled. [`KeywordSet`] is that identity: two sets
//! with the same members are the same variant, independent of the order in
//! which the keywords were inserted.
//!
//! # Canonical Order
//!
//! Members are stored as interned [`Symbol`]s kept sorted by their *string*
//! value (not by symbol id). This gives:
//!
//! - **Order-independent identity**: `{A, B}` and `{B, A}` have identical storage
//! - **Reproducible output**: rendered keyword lists do not depend on the order
//!   in which names happened to be interned in this process
//! - **Cheap comparison**: equality and hashing are over integer slices
//!
//! A [`KeywordGroup`] is one declared set of mutually exclusive options. The
//! literal [`DEFAULT_KEYWORD`] (`_`) denotes the "no keyword" choice.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::interner::{self, Symbol};

/// Placeholder option denoting the default (no keyword) choice of a group.
pub const DEFAULT_KEYWORD: &str = "_";

#[inline]
fn cmp_by_name(a: Symbol, b: Symbol) -> Ordering {
    interner::resolve(a).cmp(interner::resolve(b))
}

// ─── KeywordSet ──────────────────────────────────────────────────────────────

/// An immutable-by-convention, order-independent set of keywords.
///
/// Used as the map key of per-variant indices. A `KeywordSet` stored as a key
/// is an owned snapshot; mutating a set the caller reuses afterwards never
/// affects stored keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: SmallVec<[Symbol; 4]>,
}

impl KeywordSet {
    /// Creates an empty keyword set (the default variant).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            keywords: SmallVec::new(),
        }
    }

    /// Inserts a keyword. Returns `false` if it was already present.
    pub fn insert(&mut self, keyword: &str) -> bool {
        self.insert_symbol(interner::intern(keyword))
    }

    /// Inserts an interned keyword, keeping the canonical order.
    pub fn insert_symbol(&mut self, keyword: Symbol) -> bool {
        match self
            .keywords
            .binary_search_by(|&probe| cmp_by_name(probe, keyword))
        {
            Ok(_) => false,
            Err(idx) => {
                self.keywords.insert(idx, keyword);
                true
            }
        }
    }

    /// Removes a keyword. Returns `true` if it was present.
    pub fn remove(&mut self, keyword: &str) -> bool {
        let Some(sym) = interner::get(keyword) else {
            return false;
        };
        match self
            .keywords
            .binary_search_by(|&probe| cmp_by_name(probe, sym))
        {
            Ok(idx) => {
                self.keywords.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        interner::get(keyword).is_some_and(|sym| self.contains_symbol(sym))
    }

    #[inline]
    #[must_use]
    pub fn contains_symbol(&self, keyword: Symbol) -> bool {
        self.keywords
            .binary_search_by(|&probe| cmp_by_name(probe, keyword))
            .is_ok()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.keywords.clear();
    }

    /// Iterates the member symbols in canonical (name) order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.keywords.iter().copied()
    }

    /// Iterates the member names in canonical order.
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.keywords.iter().map(|&k| interner::resolve(k))
    }

    /// Returns `true` if every member of `self` is also a member of `other`.
    #[must_use]
    pub fn is_subset(&self, other: &KeywordSet) -> bool {
        self.keywords.iter().all(|&k| other.contains_symbol(k))
    }

    /// Merges all members of `other` into `self`.
    pub fn extend_from(&mut self, other: &KeywordSet) {
        for &k in &other.keywords {
            self.insert_symbol(k);
        }
    }

    /// Builds the exact preprocessor condition selecting this set out of
    /// `universe`: every member must be defined and every other keyword of
    /// the universe must not be.
    ///
    /// Returns `None` when the condition is vacuous (empty set in an empty
    /// universe).
    #[must_use]
    pub fn guard_expression(&self, universe: &KeywordSet) -> Option<String> {
        let mut terms: Vec<String> = Vec::with_capacity(universe.len().max(self.len()));
        for name in self.names() {
            terms.push(format!("defined({name})"));
        }
        for sym in universe.iter() {
            if !self.contains_symbol(sym) {
                terms.push(format!("!defined({})", interner::resolve(sym)));
            }
        }
        if terms.is_empty() {
            None
        } else {
            Some(terms.join(" && "))
        }
    }

    /// Computes a content hash (identical for equal sets).
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        use std::hash::BuildHasher;

        rustc_hash::FxBuildHasher.hash_one(self)
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Symbol] {
        &self.keywords
    }
}

impl Hash for KeywordSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.keywords.hash(state);
    }
}

impl<'a> FromIterator<&'a str> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for k in iter {
            set.insert(k);
        }
        set
    }
}

impl FromIterator<Symbol> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut set = Self::new();
        for k in iter {
            set.insert_symbol(k);
        }
        set
    }
}

impl From<&[&str]> for KeywordSet {
    fn from(keywords: &[&str]) -> Self {
        keywords.iter().copied().collect()
    }
}

impl fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, name) in self.names().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        f.write_str("}")
    }
}

// ─── KeywordGroup ────────────────────────────────────────────────────────────

/// One declared set of mutually exclusive keyword options.
///
/// Options keep their declaration order (it drives enumeration order); group
/// identity is the option *set*, so two nodes declaring `_ FOO` and `FOO _`
/// contribute a single group.
#[derive(Debug, Clone)]
pub struct KeywordGroup {
    options: SmallVec<[Symbol; 4]>,
    identity: KeywordSet,
}

impl KeywordGroup {
    /// Creates a group from its options. Duplicate options are dropped.
    pub fn new<'a, I>(options: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        options.into_iter().map(interner::intern).collect()
    }

    /// The synthesized all-default group (`_` only).
    #[must_use]
    pub fn all_default() -> Self {
        Self::new([DEFAULT_KEYWORD])
    }

    /// Options in declaration order (may include the `_` placeholder).
    #[inline]
    #[must_use]
    pub fn options(&self) -> &[Symbol] {
        &self.options
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Returns `true` if the group offers the default (`_`) choice.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.identity.contains(DEFAULT_KEYWORD)
    }

    /// The real keywords of the group (placeholder excluded).
    pub fn keywords(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.options.iter().copied().filter(|&k| !is_default(k))
    }

    /// The option set identifying this group.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &KeywordSet {
        &self.identity
    }

    /// Renders the group as a `#pragma multi_compile` declaration.
    #[must_use]
    pub fn pragma(&self) -> String {
        let mut line = String::from("#pragma multi_compile");
        for &option in &self.options {
            line.push(' ');
            line.push_str(interner::resolve(option));
        }
        line
    }
}

impl FromIterator<Symbol> for KeywordGroup {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut options = SmallVec::new();
        let mut identity = KeywordSet::new();
        for option in iter {
            if identity.insert_symbol(option) {
                options.push(option);
            }
        }
        Self { options, identity }
    }
}

impl PartialEq for KeywordGroup {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for KeywordGroup {}

impl Hash for KeywordGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

/// Returns `true` if `keyword` is the default placeholder.
#[inline]
#[must_use]
pub fn is_default(keyword: Symbol) -> bool {
    interner::resolve(keyword) == DEFAULT_KEYWORD
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_order_independent_identity() {
        let ab: KeywordSet = ["A", "B"].into_iter().collect();
        let ba: KeywordSet = ["B", "A"].into_iter().collect();
        let a: KeywordSet = ["A"].into_iter().collect();

        assert_eq!(ab, ba);
        assert_eq!(ab.compute_hash(), ba.compute_hash());
        assert_ne!(ab, a);
    }

    #[test]
    fn test_names_sorted_by_string() {
        // Intern in reverse order so symbol ids disagree with name order.
        interner::intern("kw_zeta");
        interner::intern("kw_alpha");

        let set: KeywordSet = ["kw_zeta", "kw_alpha"].into_iter().collect();
        let names: Vec<_> = set.names().collect();
        assert_eq!(names, ["kw_alpha", "kw_zeta"]);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut set = KeywordSet::new();
        assert!(set.insert("FOO"));
        assert!(!set.insert("FOO"));
        assert!(set.contains("FOO"));
        assert!(set.remove("FOO"));
        assert!(!set.remove("FOO"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_stored_key_is_a_snapshot() {
        let mut scratch = KeywordSet::new();
        scratch.insert("X");

        let mut map = FxHashSet::default();
        map.insert(scratch.clone());

        scratch.insert("Y");
        let x: KeywordSet = ["X"].into_iter().collect();
        assert!(map.contains(&x));
        assert!(!map.contains(&scratch));
    }

    #[test]
    fn test_guard_expression() {
        let universe: KeywordSet = ["A", "B"].into_iter().collect();
        let a: KeywordSet = ["A"].into_iter().collect();

        assert_eq!(
            a.guard_expression(&universe).as_deref(),
            Some("defined(A) && !defined(B)")
        );
        assert_eq!(
            KeywordSet::new().guard_expression(&universe).as_deref(),
            Some("!defined(A) && !defined(B)")
        );
        assert_eq!(KeywordSet::new().guard_expression(&KeywordSet::new()), None);
    }

    #[test]
    fn test_group_identity_ignores_option_order() {
        let g1 = KeywordGroup::new(["_", "FOO"]);
        let g2 = KeywordGroup::new(["FOO", "_"]);
        assert_eq!(g1, g2);
        assert!(g1.has_default());
        assert_eq!(g1.pragma(), "#pragma multi_compile _ FOO");
        assert_eq!(g2.keywords().map(interner::resolve).collect::<Vec<_>>(), ["FOO"]);
    }

    #[test]
    fn test_group_drops_duplicate_options() {
        let g = KeywordGroup::new(["LOW", "HIGH", "LOW"]);
        assert_eq!(g.len(), 2);
        assert!(!g.has_default());
    }
}
