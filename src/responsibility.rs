// src/responsibility.rs
//! Progress-reporting handle held by an in-flight materialization.

use crate::dylib::{JITDylib, SymbolDependenceMap};
use crate::error::SessionError;
use crate::session;
use crate::symbol::{SymbolFlagsMap, SymbolMap, SymbolNameSet};
use crate::unit::MaterializationUnit;

/// Ledger of the symbols an in-flight materialization still owns.
///
/// Issued to [`MaterializationUnit::materialize`]; every owned name must be
/// resolved and emitted, failed, or handed back via
/// [`replace`](Self::replace) / [`delegate`](Self::delegate). Dropping a
/// responsibility that still owns names fails them, so queries never hang on
/// an abandoned materialization.
pub struct MaterializationResponsibility {
    dylib: JITDylib,
    symbol_flags: SymbolFlagsMap,
}

impl MaterializationResponsibility {
    pub(crate) fn new(dylib: JITDylib, symbol_flags: SymbolFlagsMap) -> Self {
        Self {
            dylib,
            symbol_flags,
        }
    }

    /// The dylib the owned symbols live in.
    pub fn target_dylib(&self) -> &JITDylib {
        &self.dylib
    }

    /// The owned symbols and their promised flags.
    pub fn symbols(&self) -> &SymbolFlagsMap {
        &self.symbol_flags
    }

    /// The owned symbols at least one pending query is blocked on. A unit
    /// can materialize this hot subset and [`replace`](Self::replace) the
    /// rest.
    pub fn get_requested_symbols(&self) -> SymbolNameSet {
        session::requested_symbols(&self.dylib, &self.symbol_flags)
    }

    /// Supplies addresses for some or all owned names, advancing them to
    /// resolved and satisfying queries waiting at that state.
    ///
    /// # Panics
    ///
    /// Panics if a supplied name is not owned and materializing, or if its
    /// flags differ from the promised flags.
    pub fn notify_resolved(&self, symbols: SymbolMap) {
        for name in symbols.keys() {
            assert!(
                self.symbol_flags.contains_key(name),
                "resolving symbol '{name}' not owned by this responsibility"
            );
        }
        session::resolve(&self.dylib, symbols);
    }

    /// Advances every owned name from resolved to emitted and propagates
    /// readiness through the dependence graph. The responsibility owns
    /// nothing afterwards.
    ///
    /// # Panics
    ///
    /// Panics if any owned name has not been resolved.
    pub fn notify_emitted(&mut self) {
        let emitted = std::mem::take(&mut self.symbol_flags);
        session::emit(&self.dylib, emitted);
    }

    /// Fails every owned name: entries are removed, waiting queries complete
    /// with [`SessionError::FailedToMaterialize`], and the failure cascades
    /// to transitively dependent symbols.
    pub fn fail_materialization(mut self) {
        let failed = std::mem::take(&mut self.symbol_flags);
        session::fail(&self.dylib, failed.into_keys().collect());
    }

    /// Hands the not-yet-resolved owned names in `unit` back to the dylib.
    /// If any of them has a pending query the unit is dispatched right away,
    /// otherwise it is stored for a later lookup.
    ///
    /// # Panics
    ///
    /// Panics if `unit` names a symbol this responsibility does not own
    /// unresolved.
    pub fn replace(&mut self, unit: impl MaterializationUnit + 'static) {
        let unit: Box<dyn MaterializationUnit> = Box::new(unit);
        for name in unit.symbols().keys() {
            assert!(
                self.symbol_flags.remove(name).is_some(),
                "replacing symbol '{name}' not owned by this responsibility"
            );
        }
        session::replace(&self.dylib, unit);
    }

    /// Splits off a new responsibility owning `names`; the two track
    /// independently afterwards.
    ///
    /// # Panics
    ///
    /// Panics if any name is not currently owned.
    pub fn delegate(&mut self, names: &SymbolNameSet) -> MaterializationResponsibility {
        let mut delegated = SymbolFlagsMap::default();
        for name in names {
            let flags = self
                .symbol_flags
                .remove(name)
                .unwrap_or_else(|| panic!("delegating symbol '{name}' not owned by this responsibility"));
            delegated.insert(name.clone(), flags);
        }
        MaterializationResponsibility::new(self.dylib.clone(), delegated)
    }

    /// Extends ownership to new names defined mid-materialization. Fails
    /// with [`SessionError::DuplicateDefinition`] if any name already exists
    /// in the dylib.
    pub fn define_materializing(&mut self, symbols: SymbolFlagsMap) -> Result<(), SessionError> {
        session::define_materializing(&self.dylib, &symbols)?;
        self.symbol_flags.extend(symbols);
        Ok(())
    }

    /// Registers, for every still-unresolved owned name, dependencies on the
    /// given symbols. Self-edges are dropped, repeat calls union, and names
    /// already resolved are unaffected.
    pub fn add_dependencies_for_all(&self, dependencies: &SymbolDependenceMap) {
        session::add_dependencies(&self.dylib, &self.symbol_flags, dependencies);
    }
}

impl Drop for MaterializationResponsibility {
    fn drop(&mut self) {
        if self.symbol_flags.is_empty() {
            return;
        }
        tracing::warn!(
            dylib = %self.dylib.name(),
            symbols = self.symbol_flags.len(),
            "responsibility dropped with unresolved symbols, failing them"
        );
        let failed = std::mem::take(&mut self.symbol_flags);
        session::fail(&self.dylib, failed.into_keys().collect());
    }
}
