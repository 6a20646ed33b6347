// src/query.rs
//! Pending asynchronous symbol queries.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::dylib::DylibId;
use crate::error::SessionError;
use crate::pool::SymbolStringPtr;
use crate::symbol::{EvaluatedSymbol, SymbolMap, SymbolNameSet, SymbolState};

/// Completion continuation for a lookup.
pub type NotifyComplete = Box<dyn FnOnce(Result<SymbolMap, SessionError>) + Send>;

/// A pending request for a set of symbols to reach a required state.
///
/// The outstanding counter starts at the size of the requested name set and
/// is decremented once per symbol reaching the required state; the completion
/// continuation fires exactly once, when the counter hits zero or the query
/// fails. All mutation happens under the session lock; the inner mutex makes
/// the sharing sound, it is never contended.
pub(crate) struct AsynchronousSymbolQuery {
    required_state: SymbolState,
    inner: Mutex<QueryInner>,
}

struct QueryInner {
    outstanding: usize,
    resolved: SymbolMap,
    notify: Option<NotifyComplete>,
    // Symbols this query is parked on, for detach on failure.
    registrations: FxHashMap<DylibId, SymbolNameSet>,
}

impl AsynchronousSymbolQuery {
    pub(crate) fn new(
        symbol_count: usize,
        required_state: SymbolState,
        notify: NotifyComplete,
    ) -> Self {
        Self {
            required_state,
            inner: Mutex::new(QueryInner {
                outstanding: symbol_count,
                resolved: SymbolMap::default(),
                notify: Some(notify),
                registrations: FxHashMap::default(),
            }),
        }
    }

    pub(crate) fn required_state(&self) -> SymbolState {
        self.required_state
    }

    /// Records that `name` reached the required state.
    pub(crate) fn symbol_met_required_state(&self, name: &SymbolStringPtr, sym: EvaluatedSymbol) {
        let mut inner = self.inner.lock().unwrap();
        debug_assert!(inner.outstanding > 0, "query over-notified");
        inner.resolved.insert(name.clone(), sym);
        inner.outstanding -= 1;
    }

    /// Remembers that this query is parked on `(dylib, name)`.
    pub(crate) fn add_registration(&self, dylib: DylibId, name: SymbolStringPtr) {
        let mut inner = self.inner.lock().unwrap();
        inner.registrations.entry(dylib).or_default().insert(name);
    }

    pub(crate) fn remove_registration(&self, dylib: DylibId, name: &SymbolStringPtr) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(names) = inner.registrations.get_mut(&dylib) {
            names.remove(name);
            if names.is_empty() {
                inner.registrations.remove(&dylib);
            }
        }
    }

    /// The symbols the query is still parked on, leaving the query detached.
    pub(crate) fn take_registrations(&self) -> FxHashMap<DylibId, SymbolNameSet> {
        std::mem::take(&mut self.inner.lock().unwrap().registrations)
    }

    /// Clones the registration map without detaching.
    pub(crate) fn registrations(&self) -> FxHashMap<DylibId, SymbolNameSet> {
        self.inner.lock().unwrap().registrations.clone()
    }

    /// If every requested symbol has met the required state, takes the
    /// completion continuation and accumulated result for firing.
    pub(crate) fn take_completion(&self) -> Option<(NotifyComplete, SymbolMap)> {
        let mut inner = self.inner.lock().unwrap();
        if inner.outstanding > 0 {
            return None;
        }
        let notify = inner.notify.take()?;
        let resolved = std::mem::take(&mut inner.resolved);
        Some((notify, resolved))
    }

    /// Takes the completion continuation for failure delivery. Returns
    /// `None` if the query already completed.
    pub(crate) fn take_notify_for_failure(&self) -> Option<NotifyComplete> {
        self.inner.lock().unwrap().notify.take()
    }
}
