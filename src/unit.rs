// src/unit.rs
//! Materialization units: deferred producers of symbol definitions.

use crate::dylib::JITDylib;
use crate::pool::SymbolStringPtr;
use crate::responsibility::MaterializationResponsibility;
use crate::symbol::SymbolFlagsMap;

/// A deferred producer for a set of symbols.
///
/// A unit advertises the flags of every symbol it can provide. When a lookup
/// touches one of those symbols the whole unit is dispatched and
/// [`materialize`](Self::materialize) runs with a responsibility covering
/// the names the unit still owns. The unit must eventually resolve and emit
/// every owned name, or fail.
///
/// `discard` is invoked when one of the unit's weak names is superseded by
/// another definition, or when an unmaterialized name is removed; it runs
/// under the session lock and must not call back into the session. The same
/// restriction applies to `Drop` impls: a unit is dropped as soon as it owns
/// no remaining names.
pub trait MaterializationUnit: Send {
    /// Human-readable tag for logging.
    fn name(&self) -> &str {
        "<unnamed>"
    }

    /// The symbols this unit provides and their flags.
    fn symbols(&self) -> &SymbolFlagsMap;

    /// Produces the owned symbols, reporting progress through `r`.
    fn materialize(self: Box<Self>, r: MaterializationResponsibility);

    /// Notification that `name` has been dropped from this unit.
    fn discard(&mut self, dylib: &JITDylib, name: &SymbolStringPtr) {
        let _ = (dylib, name);
    }
}

type MaterializeFn = Box<dyn FnOnce(MaterializationResponsibility) + Send>;
type DiscardFn = Box<dyn FnMut(&JITDylib, &SymbolStringPtr) + Send>;
type DestructorFn = Box<dyn FnOnce() + Send>;

/// Closure-backed [`MaterializationUnit`] for callers that do not want a
/// dedicated type.
pub struct SimpleMaterializationUnit {
    symbols: SymbolFlagsMap,
    materialize: Option<MaterializeFn>,
    discard: Option<DiscardFn>,
    destructor: Option<DestructorFn>,
}

impl SimpleMaterializationUnit {
    pub fn new(
        symbols: SymbolFlagsMap,
        materialize: impl FnOnce(MaterializationResponsibility) + Send + 'static,
    ) -> Self {
        Self {
            symbols,
            materialize: Some(Box::new(materialize)),
            discard: None,
            destructor: None,
        }
    }

    pub fn with_discard(
        mut self,
        discard: impl FnMut(&JITDylib, &SymbolStringPtr) + Send + 'static,
    ) -> Self {
        self.discard = Some(Box::new(discard));
        self
    }

    /// Runs when the unit is destroyed, i.e. once it owns no symbols.
    pub fn with_destructor(mut self, destructor: impl FnOnce() + Send + 'static) -> Self {
        self.destructor = Some(Box::new(destructor));
        self
    }
}

impl MaterializationUnit for SimpleMaterializationUnit {
    fn name(&self) -> &str {
        "<simple>"
    }

    fn symbols(&self) -> &SymbolFlagsMap {
        &self.symbols
    }

    fn materialize(mut self: Box<Self>, r: MaterializationResponsibility) {
        let materialize = self
            .materialize
            .take()
            .expect("materialize invoked more than once");
        materialize(r);
    }

    fn discard(&mut self, dylib: &JITDylib, name: &SymbolStringPtr) {
        self.symbols.remove(name);
        if let Some(discard) = self.discard.as_mut() {
            discard(dylib, name);
        }
    }
}

impl Drop for SimpleMaterializationUnit {
    fn drop(&mut self) {
        if let Some(destructor) = self.destructor.take() {
            destructor();
        }
    }
}
