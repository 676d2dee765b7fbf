//! Loom Core
//!
//! Foundational types shared by the Loom crates: the global string interner,
//! order-independent keyword sets, the error type and scratch buffer pools.

pub mod errors;
pub mod interner;
pub mod keywords;
pub mod scratch;

pub use errors::{LoomError, Result};
pub use interner::Symbol;
pub use keywords::{DEFAULT_KEYWORD, KeywordGroup, KeywordSet};
pub use scratch::{Scratch, ScratchPool};
