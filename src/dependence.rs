// src/dependence.rs
//! Per-symbol dependence tracking and pending-query bookkeeping.
//!
//! Edges are stored symmetrically: a symbol knows the not-yet-emitted
//! symbols it depends on (`unemitted_dependencies`) and the symbols that
//! depend on it (`dependants`). The graph is intrinsically cyclic, so
//! readiness is propagated by relaxation: when a symbol is emitted, its
//! remaining unemitted dependencies are transferred down to each dependant,
//! and any dependant left emitted with an empty set becomes ready. The last
//! member of a cycle to emit therefore releases the whole component.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::dylib::DylibId;
use crate::pool::SymbolStringPtr;
use crate::query::AsynchronousSymbolQuery;
use crate::symbol::{SymbolNameSet, SymbolState};

/// A symbol qualified by the dylib that owns it.
pub(crate) type SymbolKey = (DylibId, SymbolStringPtr);

/// Adjacency rows keyed by dylib, mirroring the public dependence map shape.
pub(crate) type EdgeMap = FxHashMap<DylibId, SymbolNameSet>;

fn edge_insert(map: &mut EdgeMap, key: &SymbolKey) -> bool {
    map.entry(key.0).or_default().insert(key.1.clone())
}

fn edge_remove(map: &mut EdgeMap, key: &SymbolKey) {
    if let Some(names) = map.get_mut(&key.0) {
        names.remove(&key.1);
        if names.is_empty() {
            map.remove(&key.0);
        }
    }
}

fn edge_keys(map: &EdgeMap) -> Vec<SymbolKey> {
    let mut keys = Vec::new();
    for (dylib, names) in map {
        for name in names {
            keys.push((*dylib, name.clone()));
        }
    }
    keys
}

/// Tracking state for one symbol in the materialization phase.
#[derive(Default)]
pub(crate) struct MaterializingInfo {
    pub(crate) dependants: EdgeMap,
    pub(crate) unemitted_dependencies: EdgeMap,
    pub(crate) is_emitted: bool,
    pending_queries: SmallVec<[Arc<AsynchronousSymbolQuery>; 2]>,
}

impl MaterializingInfo {
    pub(crate) fn add_query(&mut self, query: Arc<AsynchronousSymbolQuery>) {
        self.pending_queries.push(query);
    }

    pub(crate) fn remove_query(&mut self, query: &Arc<AsynchronousSymbolQuery>) {
        self.pending_queries.retain(|q| !Arc::ptr_eq(q, query));
    }

    pub(crate) fn has_pending_queries(&self) -> bool {
        !self.pending_queries.is_empty()
    }

    /// Takes every pending query whose required state is met by `reached`.
    pub(crate) fn take_queries_meeting(
        &mut self,
        reached: SymbolState,
    ) -> SmallVec<[Arc<AsynchronousSymbolQuery>; 2]> {
        let mut met = SmallVec::new();
        self.pending_queries.retain(|q| {
            if q.required_state() <= reached {
                met.push(q.clone());
                false
            } else {
                true
            }
        });
        met
    }

    pub(crate) fn take_all_queries(&mut self) -> SmallVec<[Arc<AsynchronousSymbolQuery>; 2]> {
        std::mem::take(&mut self.pending_queries)
    }

    pub(crate) fn unemitted_keys(&self) -> Vec<SymbolKey> {
        edge_keys(&self.unemitted_dependencies)
    }

    pub(crate) fn dependant_keys(&self) -> Vec<SymbolKey> {
        edge_keys(&self.dependants)
    }

    pub(crate) fn remove_dependant(&mut self, key: &SymbolKey) {
        edge_remove(&mut self.dependants, key);
    }
}

/// Session-wide dependence graph over every dylib's materializing symbols.
#[derive(Default)]
pub(crate) struct DependencyTracker {
    infos: FxHashMap<SymbolKey, MaterializingInfo>,
}

impl DependencyTracker {
    pub(crate) fn get(&self, key: &SymbolKey) -> Option<&MaterializingInfo> {
        self.infos.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &SymbolKey) -> Option<&mut MaterializingInfo> {
        self.infos.get_mut(key)
    }

    pub(crate) fn entry(&mut self, key: &SymbolKey) -> &mut MaterializingInfo {
        self.infos.entry(key.clone()).or_default()
    }

    pub(crate) fn remove(&mut self, key: &SymbolKey) -> Option<MaterializingInfo> {
        self.infos.remove(key)
    }

    /// Adds the directed edge `dependant -> dependency`. Self-edges are
    /// filtered here so callers need not care.
    pub(crate) fn add_edge(&mut self, dependant: &SymbolKey, dependency: &SymbolKey) {
        if dependant == dependency {
            return;
        }
        edge_insert(
            &mut self.entry(dependant).unemitted_dependencies,
            dependency,
        );
        edge_insert(&mut self.entry(dependency).dependants, dependant);
    }

    /// Drops `dependency` from `dependant`'s unemitted set.
    pub(crate) fn remove_unemitted(&mut self, dependant: &SymbolKey, dependency: &SymbolKey) {
        if let Some(mi) = self.infos.get_mut(dependant) {
            edge_remove(&mut mi.unemitted_dependencies, dependency);
        }
    }

    /// Transfers the unemitted dependencies of `emitted` onto `dependant`,
    /// skipping self-edges. This is the relaxation step that keeps
    /// transitive dependence visible after intermediate nodes emit.
    pub(crate) fn transfer_emitted_dependencies(
        &mut self,
        dependant: &SymbolKey,
        emitted: &SymbolKey,
    ) {
        let transferred = match self.infos.get(emitted) {
            Some(mi) => edge_keys(&mi.unemitted_dependencies),
            None => return,
        };
        for dep in transferred {
            self.add_edge(dependant, &dep);
        }
    }

    /// All symbols depending on `key`, clearing the stored set.
    pub(crate) fn take_dependants(&mut self, key: &SymbolKey) -> Vec<SymbolKey> {
        match self.infos.get_mut(key) {
            Some(mi) => edge_keys(&std::mem::take(&mut mi.dependants)),
            None => Vec::new(),
        }
    }

    /// All symbols `key` depends on that have not yet emitted.
    pub(crate) fn unemitted_dependencies_of(&self, key: &SymbolKey) -> Vec<SymbolKey> {
        match self.infos.get(key) {
            Some(mi) => edge_keys(&mi.unemitted_dependencies),
            None => Vec::new(),
        }
    }

    /// Detaches `query` from every symbol it is parked on.
    pub(crate) fn detach_query(&mut self, query: &Arc<AsynchronousSymbolQuery>) {
        for (dylib, names) in query.take_registrations() {
            for name in names {
                if let Some(mi) = self.infos.get_mut(&(dylib, name)) {
                    mi.remove_query(query);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SymbolStringPool;

    fn key(pool: &SymbolStringPool, dylib: u32, name: &str) -> SymbolKey {
        (DylibId(dylib), pool.intern(name))
    }

    #[test]
    fn self_edges_are_filtered() {
        let pool = SymbolStringPool::new();
        let foo = key(&pool, 0, "foo");

        let mut tracker = DependencyTracker::default();
        tracker.add_edge(&foo, &foo);
        assert!(tracker.get(&foo).is_none());
    }

    #[test]
    fn edges_are_stored_symmetrically() {
        let pool = SymbolStringPool::new();
        let foo = key(&pool, 0, "foo");
        let bar = key(&pool, 1, "bar");

        let mut tracker = DependencyTracker::default();
        tracker.add_edge(&foo, &bar);

        assert_eq!(tracker.unemitted_dependencies_of(&foo), vec![bar.clone()]);
        assert_eq!(tracker.take_dependants(&bar), vec![foo]);
    }

    #[test]
    fn transfer_skips_self_edges() {
        let pool = SymbolStringPool::new();
        let a = key(&pool, 0, "a");
        let b = key(&pool, 0, "b");

        let mut tracker = DependencyTracker::default();
        // b depends on a; transferring b's deps onto a must not create a -> a.
        tracker.add_edge(&b, &a);
        tracker.transfer_emitted_dependencies(&a, &b);
        assert!(tracker.unemitted_dependencies_of(&a).is_empty());
    }
}
