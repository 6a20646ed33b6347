// src/session.rs
//! The execution session: shared state, lookups, and the transition engine.
//!
//! One session-wide mutex guards every symbol table, query counter, and the
//! dependence graph. User code never runs under it except for unit `discard`
//! and drop notification: completions, generators, materializers, and the
//! dispatch hook are all invoked after the lock is released, so they are free
//! to re-enter the session.

use std::sync::{mpsc, Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::dependence::{DependencyTracker, SymbolKey};
use crate::dylib::{DylibId, DylibState, JITDylib, SymbolDependenceMap, UnitId, UnmaterializedUnit};
use crate::error::{sorted, SessionError};
use crate::pool::{SymbolStringPool, SymbolStringPtr};
use crate::query::{AsynchronousSymbolQuery, NotifyComplete};
use crate::responsibility::MaterializationResponsibility;
use crate::symbol::{
    EvaluatedSymbol, SymbolFlags, SymbolFlagsMap, SymbolMap, SymbolNameSet, SymbolState,
};
use crate::unit::MaterializationUnit;

/// Continuation receiving the dependence map a lookup was left waiting on,
/// so callers (typically linkers) can record edges for their own symbols.
pub type RegisterDependencies = Box<dyn FnOnce(&SymbolDependenceMap) + Send>;

/// Hook deciding where materialization runs. It must arrange for
/// [`MaterializationTask::run`] to be called eventually.
pub type DispatchMaterialization = Arc<dyn Fn(MaterializationTask) + Send + Sync>;

/// A claimed materialization unit, ready to run.
pub struct MaterializationTask {
    pub(crate) unit: Box<dyn MaterializationUnit>,
    pub(crate) responsibility: MaterializationResponsibility,
}

impl MaterializationTask {
    pub fn target_dylib(&self) -> &JITDylib {
        self.responsibility.target_dylib()
    }

    pub fn unit_name(&self) -> &str {
        self.unit.name()
    }

    /// Runs the unit's materializer on the current thread.
    pub fn run(self) {
        let MaterializationTask {
            unit,
            responsibility,
        } = self;
        unit.materialize(responsibility);
    }
}

pub(crate) struct SessionInner {
    pub(crate) pool: SymbolStringPool,
    pub(crate) state: Mutex<SessionState>,
}

pub(crate) struct SessionState {
    pub(crate) dylibs: Vec<DylibState>,
    pub(crate) tracker: DependencyTracker,
    pub(crate) dispatch: DispatchMaterialization,
    next_unit: u64,
}

impl SessionState {
    pub(crate) fn dylib(&self, id: DylibId) -> &DylibState {
        &self.dylibs[id.0 as usize]
    }

    pub(crate) fn dylib_mut(&mut self, id: DylibId) -> &mut DylibState {
        &mut self.dylibs[id.0 as usize]
    }

    pub(crate) fn next_unit_id(&mut self) -> UnitId {
        self.next_unit += 1;
        UnitId(self.next_unit)
    }
}

/// Top-level coordinator owning the name pool, the dylibs, and the
/// materialization dispatch hook.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct ExecutionSession {
    pub(crate) inner: Arc<SessionInner>,
}

impl Default for ExecutionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionSession {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                pool: SymbolStringPool::new(),
                state: Mutex::new(SessionState {
                    dylibs: Vec::new(),
                    tracker: DependencyTracker::default(),
                    dispatch: Arc::new(|task: MaterializationTask| task.run()),
                    next_unit: 0,
                }),
            }),
        }
    }

    /// Interns `name` in the session's string pool.
    pub fn intern(&self, name: &str) -> SymbolStringPtr {
        self.inner.pool.intern(name)
    }

    pub fn string_pool(&self) -> &SymbolStringPool {
        &self.inner.pool
    }

    /// Creates a new, empty dylib. Names must be unique within the session.
    pub fn create_jit_dylib(&self, name: &str) -> JITDylib {
        let mut guard = self.inner.state.lock().unwrap();
        assert!(
            !guard.dylibs.iter().any(|d| &*d.name == name),
            "dylib '{name}' already exists"
        );
        let id = DylibId(guard.dylibs.len() as u32);
        let name: Arc<str> = Arc::from(name);
        guard.dylibs.push(DylibState::new(name.clone()));
        tracing::debug!(dylib = %name, "dylib created");
        JITDylib {
            session: self.inner.clone(),
            id,
            name,
        }
    }

    /// Replaces the dispatch hook. The default runs materialization
    /// synchronously on the thread that triggered it; a caller may offload
    /// to workers instead, since tasks are `Send`.
    pub fn set_dispatch_materialization(
        &self,
        dispatch: impl Fn(MaterializationTask) + Send + Sync + 'static,
    ) {
        self.inner.state.lock().unwrap().dispatch = Arc::new(dispatch);
    }

    /// Issues an asynchronous lookup for `symbols` across `search_order`.
    ///
    /// Each search-order element pairs a dylib with a `match_non_exported`
    /// flag; when the flag is false, non-exported symbols in that dylib are
    /// invisible to this lookup. The first dylib providing a name wins.
    /// Missing names are offered to each dylib's generators in insertion
    /// order.
    ///
    /// `notify_complete` fires exactly once, with the full address map after
    /// every symbol reaches `required_state` (`Resolved` or `Ready`), or with
    /// the first error. `register_dependencies` is invoked at most once,
    /// after binding, with the map of symbols the query was left waiting on;
    /// it is skipped when the map would be empty.
    ///
    /// The caller is never blocked: materialization runs through the
    /// dispatch hook after the session lock is released.
    pub fn lookup(
        &self,
        search_order: &[(JITDylib, bool)],
        symbols: SymbolNameSet,
        required_state: SymbolState,
        notify_complete: NotifyComplete,
        register_dependencies: Option<RegisterDependencies>,
    ) {
        assert!(
            required_state == SymbolState::Resolved || required_state == SymbolState::Ready,
            "lookups may only require the Resolved or Ready state"
        );

        let query = Arc::new(AsynchronousSymbolQuery::new(
            symbols.len(),
            required_state,
            notify_complete,
        ));
        let mut unresolved = symbols;
        let mut dispatches = Vec::new();

        'search: for (dylib, match_non_exported) in search_order {
            assert!(
                Arc::ptr_eq(&dylib.session, &self.inner),
                "search order names a dylib from another session"
            );
            let mut generator_idx = 0;
            loop {
                let (generator, missing) = {
                    let mut guard = self.inner.state.lock().unwrap();
                    bind_existing(
                        &mut guard,
                        dylib,
                        *match_non_exported,
                        &query,
                        &mut unresolved,
                        &mut dispatches,
                    );
                    if unresolved.is_empty() {
                        break 'search;
                    }
                    let state = guard.dylib(dylib.id);
                    let missing: SymbolNameSet = unresolved
                        .iter()
                        .filter(|name| !state.symbols.contains_key(*name))
                        .cloned()
                        .collect();
                    if missing.is_empty() || generator_idx >= state.generators.len() {
                        break;
                    }
                    let generator = state.generators[generator_idx].clone();
                    generator_idx += 1;
                    (generator, missing)
                };
                // Generators run unlocked so they can define symbols.
                if let Err(err) = generator.try_to_generate(dylib, &missing) {
                    self.fail_query(&query, err);
                    self.dispatch_tasks(dispatches);
                    return;
                }
            }
        }

        if !unresolved.is_empty() {
            self.fail_query(&query, SessionError::SymbolsNotFound(sorted(&unresolved)));
            self.dispatch_tasks(dispatches);
            return;
        }

        if let Some(register) = register_dependencies {
            let registrations = query.registrations();
            if !registrations.is_empty() {
                let dependencies = self.as_dependence_map(registrations);
                register(&dependencies);
            }
        }

        if let Some((notify, result)) = query.take_completion() {
            notify(Ok(result));
        }
        self.dispatch_tasks(dispatches);
    }

    /// Synchronous convenience form of [`lookup`](Self::lookup) at `Ready`.
    pub fn lookup_blocking(
        &self,
        search_order: &[(JITDylib, bool)],
        symbols: SymbolNameSet,
    ) -> Result<SymbolMap, SessionError> {
        let (tx, rx) = mpsc::channel();
        self.lookup(
            search_order,
            symbols,
            SymbolState::Ready,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
            None,
        );
        match rx.recv() {
            Ok(result) => result,
            Err(_) => Err(SessionError::Other(
                "lookup abandoned without completing".to_string(),
            )),
        }
    }

    /// Fails a query outright, detaching it from every symbol it waits on.
    pub(crate) fn fail_query(&self, query: &Arc<AsynchronousSymbolQuery>, err: SessionError) {
        self.inner.state.lock().unwrap().tracker.detach_query(query);
        if let Some(notify) = query.take_notify_for_failure() {
            tracing::debug!(error = %err, "query failed");
            notify(Err(err));
        }
    }

    fn dispatch_tasks(&self, tasks: Vec<MaterializationTask>) {
        if tasks.is_empty() {
            return;
        }
        let dispatch = self.inner.state.lock().unwrap().dispatch.clone();
        for task in tasks {
            dispatch(task);
        }
    }

    fn as_dependence_map(
        &self,
        registrations: FxHashMap<DylibId, SymbolNameSet>,
    ) -> SymbolDependenceMap {
        let guard = self.inner.state.lock().unwrap();
        registrations
            .into_iter()
            .map(|(id, names)| {
                let handle = JITDylib {
                    session: self.inner.clone(),
                    id,
                    name: guard.dylib(id).name.clone(),
                };
                (handle, names)
            })
            .collect()
    }
}

/// Binds every name of `unresolved` that `dylib` can satisfy: names at or
/// past the query's required state are recorded immediately, the rest park
/// the query on their entry. Touching a never-searched name claims its whole
/// unit for dispatch.
fn bind_existing(
    state: &mut SessionState,
    dylib: &JITDylib,
    match_non_exported: bool,
    query: &Arc<AsynchronousSymbolQuery>,
    unresolved: &mut SymbolNameSet,
    dispatches: &mut Vec<MaterializationTask>,
) {
    let candidates: Vec<SymbolStringPtr> = unresolved.iter().cloned().collect();
    for name in candidates {
        let tables = state.dylib_mut(dylib.id);
        let Some(entry) = tables.symbols.get_mut(&name) else {
            continue;
        };
        if !match_non_exported && !entry.flags.is_exported() {
            continue;
        }

        if entry.state == SymbolState::NeverSearched {
            let uid = tables.unmaterialized[&name];
            let claimed = tables
                .units
                .remove(&uid)
                .expect("never-searched symbol names a missing unit");
            for owned_name in claimed.remaining.keys() {
                tables.unmaterialized.remove(owned_name);
                let owned_entry = tables
                    .symbols
                    .get_mut(owned_name)
                    .expect("unit promises a symbol missing from the table");
                owned_entry.state = SymbolState::Materializing;
                owned_entry.flags =
                    (owned_entry.flags - SymbolFlags::LAZY) | SymbolFlags::MATERIALIZING;
            }
            tracing::debug!(
                dylib = %dylib.name(),
                unit = claimed.unit.name(),
                symbols = claimed.remaining.len(),
                "materialization unit claimed"
            );
            dispatches.push(MaterializationTask {
                unit: claimed.unit,
                responsibility: MaterializationResponsibility::new(
                    dylib.clone(),
                    claimed.remaining,
                ),
            });
        }

        let (entry_state, address, entry_flags) = {
            let entry = state
                .dylib(dylib.id)
                .symbols
                .get(&name)
                .expect("entry vanished while binding");
            (entry.state, entry.address, entry.flags)
        };
        if entry_state >= query.required_state() {
            query.symbol_met_required_state(
                &name,
                EvaluatedSymbol::new(address, entry_flags.without_bookkeeping()),
            );
        } else {
            state
                .tracker
                .entry(&(dylib.id, name.clone()))
                .add_query(query.clone());
            query.add_registration(dylib.id, name.clone());
        }
        unresolved.remove(&name);
    }
}

type Completion = (NotifyComplete, SymbolMap);

/// Assigns addresses to materializing symbols and satisfies queries waiting
/// at `Resolved`.
pub(crate) fn resolve(dylib: &JITDylib, resolved: SymbolMap) {
    let mut completed: Vec<Completion> = Vec::new();
    {
        let mut guard = dylib.session.state.lock().unwrap();
        let state = &mut *guard;
        for (name, sym) in &resolved {
            let entry = state
                .dylib_mut(dylib.id)
                .symbols
                .get_mut(name)
                .unwrap_or_else(|| panic!("resolving unknown symbol '{name}'"));
            assert_eq!(
                entry.state,
                SymbolState::Materializing,
                "symbol '{name}' resolved out of order"
            );
            assert_eq!(
                entry.flags.without_bookkeeping(),
                sym.flags.without_bookkeeping(),
                "resolved flags for '{name}' differ from the promised flags"
            );
            entry.address = sym.address;
            entry.flags = sym.flags | SymbolFlags::MATERIALIZING;
            entry.state = SymbolState::Resolved;
            tracing::trace!(dylib = %dylib.name(), symbol = %name, address = sym.address, "resolved");

            if let Some(mi) = state.tracker.get_mut(&(dylib.id, name.clone())) {
                for query in mi.take_queries_meeting(SymbolState::Resolved) {
                    query.remove_registration(dylib.id, name);
                    query.symbol_met_required_state(
                        name,
                        EvaluatedSymbol::new(sym.address, sym.flags.without_bookkeeping()),
                    );
                    if let Some(done) = query.take_completion() {
                        completed.push(done);
                    }
                }
            }
        }
    }
    for (notify, result) in completed {
        notify(Ok(result));
    }
}

/// Moves the named symbols from `Resolved` to `Emitted` and relaxes the
/// dependence graph: every symbol left emitted with no unemitted
/// dependencies (including whole cycles once their last member emits)
/// becomes `Ready` and completes its queries.
pub(crate) fn emit(dylib: &JITDylib, emitted: SymbolFlagsMap) {
    let mut completed: Vec<Completion> = Vec::new();
    {
        let mut guard = dylib.session.state.lock().unwrap();
        let state = &mut *guard;
        for name in emitted.keys() {
            let key: SymbolKey = (dylib.id, name.clone());
            {
                let entry = state
                    .dylib_mut(dylib.id)
                    .symbols
                    .get_mut(name)
                    .unwrap_or_else(|| panic!("emitting unknown symbol '{name}'"));
                assert_eq!(
                    entry.state,
                    SymbolState::Resolved,
                    "symbol '{name}' emitted before it was resolved"
                );
                entry.state = SymbolState::Emitted;
                entry.flags -= SymbolFlags::MATERIALIZING;
            }
            tracing::trace!(dylib = %dylib.name(), symbol = %name, "emitted");

            // Each dependant loses its edge on this symbol and inherits the
            // symbol's remaining unemitted dependencies, keeping transitive
            // dependence visible after intermediate nodes emit.
            for dep_key in state.tracker.take_dependants(&key) {
                state.tracker.remove_unemitted(&dep_key, &key);
                state.tracker.transfer_emitted_dependencies(&dep_key, &key);
                let now_ready = state
                    .tracker
                    .get(&dep_key)
                    .is_some_and(|mi| mi.is_emitted && mi.unemitted_dependencies.is_empty());
                if now_ready {
                    mark_ready(state, &dep_key, &mut completed);
                }
            }

            let ready_now = {
                let mi = state.tracker.entry(&key);
                mi.is_emitted = true;
                mi.unemitted_dependencies.is_empty()
            };
            if ready_now {
                mark_ready(state, &key, &mut completed);
            }
        }
    }
    for (notify, result) in completed {
        notify(Ok(result));
    }
}

fn mark_ready(state: &mut SessionState, key: &SymbolKey, completed: &mut Vec<Completion>) {
    let Some(mut mi) = state.tracker.remove(key) else {
        return;
    };
    debug_assert!(
        mi.dependants.is_empty(),
        "symbol became ready while something still depends on its emission"
    );
    let (address, flags) = {
        let entry = state
            .dylib_mut(key.0)
            .symbols
            .get_mut(&key.1)
            .expect("ready symbol missing from the table");
        entry.state = SymbolState::Ready;
        (entry.address, entry.flags.without_bookkeeping())
    };
    tracing::debug!(symbol = %key.1, "ready");
    for query in mi.take_all_queries() {
        query.remove_registration(key.0, &key.1);
        query.symbol_met_required_state(&key.1, EvaluatedSymbol::new(address, flags));
        if let Some(done) = query.take_completion() {
            completed.push(done);
        }
    }
}

/// Fails the named symbols and everything transitively depending on them.
/// Affected entries are removed; every query parked anywhere on the failure
/// set completes with [`SessionError::FailedToMaterialize`] naming the
/// originally failed symbols.
pub(crate) fn fail(dylib: &JITDylib, names: SymbolNameSet) {
    let mut failed_queries: Vec<Arc<AsynchronousSymbolQuery>> = Vec::new();
    {
        let mut guard = dylib.session.state.lock().unwrap();
        let state = &mut *guard;
        let mut worklist: Vec<SymbolKey> =
            names.iter().map(|name| (dylib.id, name.clone())).collect();
        let mut visited: rustc_hash::FxHashSet<SymbolKey> = rustc_hash::FxHashSet::default();

        while let Some(key) = worklist.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            state.dylib_mut(key.0).symbols.remove(&key.1);
            tracing::warn!(symbol = %key.1, "materialization failed");

            let Some(mut mi) = state.tracker.remove(&key) else {
                continue;
            };
            // Sever reverse edges from the dependencies we were waiting on.
            for dep_key in mi.unemitted_keys() {
                if let Some(dep_mi) = state.tracker.get_mut(&dep_key) {
                    dep_mi.remove_dependant(&key);
                }
            }
            // Cascade to everything that depended on this symbol.
            worklist.extend(mi.dependant_keys());

            for query in mi.take_all_queries() {
                state.tracker.detach_query(&query);
                if !failed_queries.iter().any(|q| Arc::ptr_eq(q, &query)) {
                    failed_queries.push(query);
                }
            }
        }
    }

    let failed: Vec<SymbolStringPtr> = sorted(&names);
    for query in failed_queries {
        if let Some(notify) = query.take_notify_for_failure() {
            notify(Err(SessionError::FailedToMaterialize(failed.clone())));
        }
    }
}

/// Hands not-yet-resolved symbols back to the dylib as a fresh unit. If any
/// of them already has a pending query the unit is dispatched immediately.
pub(crate) fn replace(dylib: &JITDylib, unit: Box<dyn MaterializationUnit>) {
    let task = {
        let mut guard = dylib.session.state.lock().unwrap();
        let state = &mut *guard;
        for name in unit.symbols().keys() {
            let entry = state
                .dylib(dylib.id)
                .symbols
                .get(name)
                .unwrap_or_else(|| panic!("replacing unknown symbol '{name}'"));
            assert_eq!(
                entry.state,
                SymbolState::Materializing,
                "replacing symbol '{name}' that is already resolved"
            );
        }

        let must_run = unit.symbols().keys().any(|name| {
            state
                .tracker
                .get(&(dylib.id, name.clone()))
                .is_some_and(|mi| mi.has_pending_queries())
        });

        if must_run {
            let remaining = unit.symbols().clone();
            tracing::debug!(
                dylib = %dylib.name(),
                unit = unit.name(),
                "replacement unit has pending queries, dispatching"
            );
            Some(MaterializationTask {
                unit,
                responsibility: MaterializationResponsibility::new(dylib.clone(), remaining),
            })
        } else {
            let remaining = unit.symbols().clone();
            let uid = state.next_unit_id();
            let tables = state.dylib_mut(dylib.id);
            for (name, flags) in &remaining {
                let entry = tables
                    .symbols
                    .get_mut(name)
                    .expect("replaced symbol vanished from the table");
                entry.state = SymbolState::NeverSearched;
                entry.flags = *flags | SymbolFlags::LAZY;
                entry.address = 0;
                tables.unmaterialized.insert(name.clone(), uid);
            }
            tables.units.insert(uid, UnmaterializedUnit { unit, remaining });
            None
        }
    };
    if let Some(task) = task {
        let dispatch = dylib.session.state.lock().unwrap().dispatch.clone();
        dispatch(task);
    }
}

/// Defines additional symbols mid-materialization; they enter the table
/// already materializing. Fails if any name exists.
pub(crate) fn define_materializing(
    dylib: &JITDylib,
    symbols: &SymbolFlagsMap,
) -> Result<(), SessionError> {
    let mut guard = dylib.session.state.lock().unwrap();
    let tables = guard.dylib_mut(dylib.id);
    for name in symbols.keys() {
        if tables.symbols.contains_key(name) {
            return Err(SessionError::DuplicateDefinition(name.clone()));
        }
    }
    for (name, flags) in symbols {
        tables.symbols.insert(
            name.clone(),
            crate::dylib::SymbolTableEntry {
                flags: *flags | SymbolFlags::MATERIALIZING,
                address: 0,
                state: SymbolState::Materializing,
            },
        );
    }
    Ok(())
}

/// The subset of `owned` some pending query is blocked on.
pub(crate) fn requested_symbols(dylib: &JITDylib, owned: &SymbolFlagsMap) -> SymbolNameSet {
    let guard = dylib.session.state.lock().unwrap();
    owned
        .keys()
        .filter(|name| {
            guard
                .tracker
                .get(&(dylib.id, (*name).clone()))
                .is_some_and(|mi| mi.has_pending_queries())
        })
        .cloned()
        .collect()
}

/// Registers dependence edges for every still-unresolved name of `owned`.
/// Names already resolved are skipped, as are dependencies on symbols that
/// are already ready. Dependencies must name defined symbols.
pub(crate) fn add_dependencies(
    dylib: &JITDylib,
    owned: &SymbolFlagsMap,
    dependencies: &SymbolDependenceMap,
) {
    let mut guard = dylib.session.state.lock().unwrap();
    let state = &mut *guard;
    for name in owned.keys() {
        let key: SymbolKey = (dylib.id, name.clone());
        let Some(entry) = state.dylib(dylib.id).symbols.get(name) else {
            continue;
        };
        if entry.state >= SymbolState::Resolved {
            continue;
        }
        for (dep_dylib, dep_names) in dependencies {
            assert!(
                Arc::ptr_eq(&dep_dylib.session, &dylib.session),
                "dependence map names a dylib from another session"
            );
            for dep_name in dep_names {
                let dep_key: SymbolKey = (dep_dylib.id, dep_name.clone());
                if dep_key == key {
                    continue;
                }
                let dep_state = state
                    .dylib(dep_dylib.id)
                    .symbols
                    .get(dep_name)
                    .map(|e| e.state)
                    .unwrap_or_else(|| panic!("dependency on unknown symbol '{dep_name}'"));
                match dep_state {
                    SymbolState::Ready => {}
                    SymbolState::Emitted => {
                        // Emitted but not ready: inherit whatever it is
                        // still waiting on instead of the symbol itself.
                        state.tracker.transfer_emitted_dependencies(&key, &dep_key);
                    }
                    _ => state.tracker.add_edge(&key, &dep_key),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn fail_query_delivers_the_supplied_error() {
        let session = ExecutionSession::new();
        let completed = Arc::new(AtomicBool::new(false));
        let completed_in = completed.clone();

        let query = Arc::new(AsynchronousSymbolQuery::new(
            1,
            SymbolState::Ready,
            Box::new(move |result| {
                let err = result.expect_err("query should have failed");
                assert_eq!(err.to_string(), "xyz");
                completed_in.store(true, Ordering::SeqCst);
            }),
        ));

        session.fail_query(&query, SessionError::Other("xyz".to_string()));
        assert!(completed.load(Ordering::SeqCst), "completion did not run");
    }

    #[test]
    fn empty_lookup_completes_immediately() {
        let session = ExecutionSession::new();
        let dylib = session.create_jit_dylib("main");
        let completed = Arc::new(AtomicBool::new(false));
        let completed_in = completed.clone();

        session.lookup(
            &[(dylib, false)],
            SymbolNameSet::default(),
            SymbolState::Ready,
            Box::new(move |result| {
                assert!(result.expect("empty lookup should succeed").is_empty());
                completed_in.store(true, Ordering::SeqCst);
            }),
            None,
        );
        assert!(completed.load(Ordering::SeqCst), "completion did not run");
    }

    #[test]
    #[should_panic(expected = "already exists")]
    fn duplicate_dylib_names_are_rejected() {
        let session = ExecutionSession::new();
        let _ = session.create_jit_dylib("main");
        let _ = session.create_jit_dylib("main");
    }
}
