// src/pool.rs
//! Interning of symbol names to canonical refcounted pointers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashSet;

/// A canonical, refcounted symbol name.
///
/// Two pointers from the same pool are equal iff they point at the same
/// allocation, so equality and hashing never touch the string bytes.
#[derive(Clone)]
pub struct SymbolStringPtr(Arc<str>);

impl SymbolStringPtr {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for SymbolStringPtr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SymbolStringPtr {}

impl Hash for SymbolStringPtr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const u8 as usize).hash(state);
    }
}

// Within a pool, distinct pointers always hold distinct strings, so ordering
// by content is consistent with pointer equality.
impl PartialOrd for SymbolStringPtr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SymbolStringPtr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl fmt::Display for SymbolStringPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for SymbolStringPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

/// Interns strings to canonical [`SymbolStringPtr`]s.
///
/// Reads are concurrent from the caller's perspective; inserts are serialized
/// on an internal lock. The pool keeps a name alive at least as long as any
/// referrer; entries nobody else holds can be reclaimed with
/// [`clear_dead_entries`](Self::clear_dead_entries).
#[derive(Debug, Default)]
pub struct SymbolStringPool {
    strings: Mutex<FxHashSet<Arc<str>>>,
}

impl SymbolStringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical pointer for `s`, creating it on first sight.
    pub fn intern(&self, s: &str) -> SymbolStringPtr {
        let mut strings = self.strings.lock().unwrap();
        if let Some(existing) = strings.get(s) {
            return SymbolStringPtr(existing.clone());
        }
        let arc: Arc<str> = Arc::from(s);
        strings.insert(arc.clone());
        SymbolStringPtr(arc)
    }

    /// Drops pool entries with no outside referrers. Returns how many were
    /// reclaimed.
    pub fn clear_dead_entries(&self) -> usize {
        let mut strings = self.strings.lock().unwrap();
        let before = strings.len();
        strings.retain(|s| Arc::strong_count(s) > 1);
        before - strings.len()
    }

    pub fn len(&self) -> usize {
        self.strings.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_returns_pointer_equal_results() {
        let pool = SymbolStringPool::new();
        let a = pool.intern("foo");
        let b = pool.intern("foo");
        let c = pool.intern("bar");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "foo");
    }

    #[test]
    fn equal_names_hash_identically() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let pool = SymbolStringPool::new();
        let a = pool.intern("foo");
        let b = pool.intern("foo");

        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn dead_entries_are_reclaimable() {
        let pool = SymbolStringPool::new();
        let keep = pool.intern("keep");
        let _ = pool.intern("drop");
        assert_eq!(pool.len(), 2);

        assert_eq!(pool.clear_dead_entries(), 1);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.intern("keep"), keep);
    }
}
