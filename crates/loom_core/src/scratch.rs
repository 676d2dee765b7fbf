//! Scratch Buffer Pool
//!
//! Reusable collections for short-lived traversal state (visited sets, DFS
//! stacks, product counters). A buffer is acquired as a [`Scratch`] guard and
//! handed back to its pool when the guard drops, so every exit path of the
//! caller, including `?` early returns, releases it.
//!
//! # Design
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │            ScratchPool<T>              │
//! │                                        │
//! │  free: RefCell<Vec<T>>                 │
//! │                                        │
//! │  acquire() → Scratch<'_, T>            │
//! │  drop(Scratch) → clear() + push(free)  │
//! └────────────────────────────────────────┘
//! ```
//!
//! The pool is single-threaded (`!Sync`). It lives inside per-pass state, so
//! passes generated on different threads never share one.

use std::cell::RefCell;
use std::hash::{BuildHasher, Hash};
use std::ops::{Deref, DerefMut};

use rustc_hash::{FxHashMap, FxHashSet};

/// A collection that can be emptied for reuse without releasing its storage.
pub trait Recyclable: Default {
    fn recycle(&mut self);
}

impl<T> Recyclable for Vec<T> {
    #[inline]
    fn recycle(&mut self) {
        self.clear();
    }
}

impl<T: Eq + Hash, S: BuildHasher + Default> Recyclable for std::collections::HashSet<T, S> {
    #[inline]
    fn recycle(&mut self) {
        self.clear();
    }
}

impl<K: Eq + Hash, V, S: BuildHasher + Default> Recyclable
    for std::collections::HashMap<K, V, S>
{
    #[inline]
    fn recycle(&mut self) {
        self.clear();
    }
}

/// Upper bound on the number of idle buffers a pool keeps.
const MAX_IDLE: usize = 8;

/// Pool of reusable scratch collections.
pub struct ScratchPool<T: Recyclable> {
    free: RefCell<Vec<T>>,
}

impl<T: Recyclable> Default for ScratchPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Recyclable> ScratchPool<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: RefCell::new(Vec::new()),
        }
    }

    /// Takes an empty buffer from the pool, allocating one if none is idle.
    pub fn acquire(&self) -> Scratch<'_, T> {
        let value = self.free.borrow_mut().pop().unwrap_or_default();
        Scratch {
            pool: self,
            value: Some(value),
        }
    }

    /// Number of idle buffers currently held.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.borrow().len()
    }

    fn release(&self, mut value: T) {
        value.recycle();
        let mut free = self.free.borrow_mut();
        if free.len() < MAX_IDLE {
            free.push(value);
        }
    }
}

/// RAII guard over a pooled buffer. Derefs to the buffer.
pub struct Scratch<'a, T: Recyclable> {
    pool: &'a ScratchPool<T>,
    value: Option<T>,
}

impl<T: Recyclable> Scratch<'_, T> {
    /// Detaches the buffer from the pool, keeping its contents.
    #[must_use]
    pub fn take(mut self) -> T {
        self.value.take().unwrap_or_default()
    }
}

impl<T: Recyclable> Deref for Scratch<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Only `take` and `drop` empty the slot, both consume the guard.
        match &self.value {
            Some(v) => v,
            None => unreachable!("scratch buffer accessed after release"),
        }
    }
}

impl<T: Recyclable> DerefMut for Scratch<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(v) => v,
            None => unreachable!("scratch buffer accessed after release"),
        }
    }
}

impl<T: Recyclable> Drop for Scratch<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.release(value);
        }
    }
}

/// Pools used by the graph traversals of one pass.
pub type VecPool<T> = ScratchPool<Vec<T>>;
pub type SetPool<T> = ScratchPool<FxHashSet<T>>;
pub type MapPool<K, V> = ScratchPool<FxHashMap<K, V>>;
