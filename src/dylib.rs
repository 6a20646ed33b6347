// src/dylib.rs
//! Symbol namespaces and their definition interface.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{sorted, SessionError};
use crate::pool::SymbolStringPtr;
use crate::session::{ExecutionSession, SessionInner};
use crate::symbol::{SymbolFlags, SymbolFlagsMap, SymbolMap, SymbolNameSet, SymbolState};
use crate::unit::MaterializationUnit;

/// Index of a dylib within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct DylibId(pub(crate) u32);

/// Identifier for a registered-but-undispatched materialization unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct UnitId(pub(crate) u64);

/// Dependencies keyed by the dylib that owns the depended-upon symbols.
pub type SymbolDependenceMap = FxHashMap<JITDylib, SymbolNameSet>;

/// Fallback symbol producer, consulted when a lookup misses a dylib's table.
///
/// Generators run in insertion order with the session lock released; a
/// generator may define symbols on this or any other dylib of the session.
/// It returns the subset of `names` it produced.
pub trait DefinitionGenerator: Send + Sync {
    fn try_to_generate(
        &self,
        dylib: &JITDylib,
        names: &SymbolNameSet,
    ) -> Result<SymbolNameSet, SessionError>;
}

pub(crate) struct SymbolTableEntry {
    pub(crate) flags: SymbolFlags,
    pub(crate) address: u64,
    pub(crate) state: SymbolState,
}

pub(crate) struct UnmaterializedUnit {
    pub(crate) unit: Box<dyn MaterializationUnit>,
    /// Names in this dylib the unit still provides.
    pub(crate) remaining: SymbolFlagsMap,
}

pub(crate) struct DylibState {
    pub(crate) name: Arc<str>,
    pub(crate) symbols: FxHashMap<SymbolStringPtr, SymbolTableEntry>,
    pub(crate) unmaterialized: FxHashMap<SymbolStringPtr, UnitId>,
    pub(crate) units: FxHashMap<UnitId, UnmaterializedUnit>,
    pub(crate) generators: Vec<Arc<dyn DefinitionGenerator>>,
}

impl DylibState {
    pub(crate) fn new(name: Arc<str>) -> Self {
        Self {
            name,
            symbols: FxHashMap::default(),
            unmaterialized: FxHashMap::default(),
            units: FxHashMap::default(),
            generators: Vec::new(),
        }
    }

    /// Drops `name` from the unit's remaining set, notifying it, and
    /// destroys the unit once nothing is left.
    pub(crate) fn discard_from_unit(
        &mut self,
        dylib: &JITDylib,
        uid: UnitId,
        name: &SymbolStringPtr,
    ) {
        let destroy = {
            let owned = self
                .units
                .get_mut(&uid)
                .expect("unmaterialized symbol names a missing unit");
            owned.remaining.remove(name);
            owned.unit.discard(dylib, name);
            owned.remaining.is_empty()
        };
        if destroy {
            tracing::trace!(dylib = %self.name, "materialization unit destroyed");
            self.units.remove(&uid);
        }
    }
}

/// A named symbol namespace within an [`ExecutionSession`].
///
/// Handles are cheap to clone and compare by identity.
#[derive(Clone)]
pub struct JITDylib {
    pub(crate) session: Arc<SessionInner>,
    pub(crate) id: DylibId,
    pub(crate) name: Arc<str>,
}

impl PartialEq for JITDylib {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.session, &other.session) && self.id == other.id
    }
}

impl Eq for JITDylib {}

impl Hash for JITDylib {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.session) as *const u8 as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for JITDylib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JITDylib").field("name", &self.name).finish()
    }
}

impl JITDylib {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> ExecutionSession {
        ExecutionSession {
            inner: self.session.clone(),
        }
    }

    /// Registers a materialization unit for the symbols it advertises.
    ///
    /// Collisions follow strong-over-weak: a strong definition over a weak
    /// unmaterialized one discards the prior definition; a weak definition
    /// over any existing one is itself discarded; a strong collision with a
    /// strong or already-searched symbol is a [`SessionError::DuplicateDefinition`].
    /// A unit left with no names is destroyed immediately.
    pub fn define(&self, unit: impl MaterializationUnit + 'static) -> Result<(), SessionError> {
        self.define_boxed(Box::new(unit))
    }

    fn define_boxed(&self, mut unit: Box<dyn MaterializationUnit>) -> Result<(), SessionError> {
        let mut guard = self.session.state.lock().unwrap();
        let state = &mut *guard;

        let mut remaining = unit.symbols().clone();
        let (existing_overridden, new_overridden) =
            classify_collisions(state.dylib(self.id), &remaining)?;

        // The unit's own weak names lose to what is already defined.
        for name in &new_overridden {
            tracing::trace!(dylib = %self.name, symbol = %name, "weak definition discarded");
            unit.discard(self, name);
            remaining.remove(name);
        }

        // Prior weak unmaterialized definitions lose to the new strong ones.
        for name in &existing_overridden {
            let dylib = state.dylib_mut(self.id);
            let uid = dylib
                .unmaterialized
                .remove(name)
                .expect("weak never-searched symbol must have an owning unit");
            dylib.symbols.remove(name);
            dylib.discard_from_unit(self, uid, name);
        }

        if remaining.is_empty() {
            // Destroyed immediately; nothing survived the collision rules.
            drop(unit);
            return Ok(());
        }

        tracing::debug!(
            dylib = %self.name,
            unit = unit.name(),
            symbols = remaining.len(),
            "unit defined"
        );

        let uid = state.next_unit_id();
        let dylib = state.dylib_mut(self.id);
        for (name, flags) in &remaining {
            dylib.symbols.insert(
                name.clone(),
                SymbolTableEntry {
                    flags: *flags | SymbolFlags::LAZY,
                    address: 0,
                    state: SymbolState::NeverSearched,
                },
            );
            dylib.unmaterialized.insert(name.clone(), uid);
        }
        dylib.units.insert(uid, UnmaterializedUnit { unit, remaining });
        Ok(())
    }

    /// Defines symbols with already-known addresses; entries are ready
    /// immediately. Collision rules match [`define`](Self::define).
    pub fn define_absolute(&self, symbols: SymbolMap) -> Result<(), SessionError> {
        let mut guard = self.session.state.lock().unwrap();
        let state = &mut *guard;

        let flags_map: SymbolFlagsMap = symbols
            .iter()
            .map(|(name, sym)| (name.clone(), sym.flags))
            .collect();
        let (existing_overridden, new_overridden) =
            classify_collisions(state.dylib(self.id), &flags_map)?;

        for name in &existing_overridden {
            let dylib = state.dylib_mut(self.id);
            let uid = dylib
                .unmaterialized
                .remove(name)
                .expect("weak never-searched symbol must have an owning unit");
            dylib.symbols.remove(name);
            dylib.discard_from_unit(self, uid, name);
        }

        let dylib = state.dylib_mut(self.id);
        for (name, sym) in symbols {
            if new_overridden.contains(&name) {
                continue;
            }
            tracing::trace!(dylib = %self.name, symbol = %name, address = sym.address, "absolute symbol defined");
            dylib.symbols.insert(
                name,
                SymbolTableEntry {
                    flags: sym.flags,
                    address: sym.address,
                    state: SymbolState::Ready,
                },
            );
        }
        Ok(())
    }

    /// Removes symbol entries.
    ///
    /// Fails with [`SessionError::SymbolsNotFound`] if any name is absent and
    /// with [`SessionError::SymbolsCouldNotBeRemoved`] if any named symbol is
    /// currently in the materialization phase. Removal of a never-searched
    /// name notifies its unit's discard; a unit losing its last name is
    /// destroyed.
    pub fn remove(&self, names: &SymbolNameSet) -> Result<(), SessionError> {
        let mut guard = self.session.state.lock().unwrap();
        let state = &mut *guard;

        let dylib = state.dylib(self.id);
        let mut missing = SymbolNameSet::default();
        let mut in_phase = SymbolNameSet::default();
        for name in names {
            match dylib.symbols.get(name) {
                None => {
                    missing.insert(name.clone());
                }
                Some(entry)
                    if entry.state >= SymbolState::Materializing
                        && entry.state < SymbolState::Ready =>
                {
                    in_phase.insert(name.clone());
                }
                Some(_) => {}
            }
        }
        if !missing.is_empty() {
            return Err(SessionError::SymbolsNotFound(sorted(&missing)));
        }
        if !in_phase.is_empty() {
            return Err(SessionError::SymbolsCouldNotBeRemoved(sorted(&in_phase)));
        }

        let dylib = state.dylib_mut(self.id);
        for name in names {
            if let Some(uid) = dylib.unmaterialized.remove(name) {
                dylib.discard_from_unit(self, uid, name);
            }
            dylib.symbols.remove(name);
            tracing::debug!(dylib = %self.name, symbol = %name, "symbol removed");
        }
        Ok(())
    }

    /// Returns the flags of the named symbols that exist, without triggering
    /// materialization. Missing names are offered to the generators; names
    /// nobody knows are omitted from the result.
    pub fn lookup_flags(&self, names: &SymbolNameSet) -> Result<SymbolFlagsMap, SessionError> {
        let mut result = SymbolFlagsMap::default();
        let mut remaining = names.clone();
        let mut generator_idx = 0;

        loop {
            let generator = {
                let guard = self.session.state.lock().unwrap();
                let dylib = guard.dylib(self.id);
                remaining.retain(|name| match dylib.symbols.get(name) {
                    Some(entry) => {
                        result.insert(name.clone(), entry.flags.without_bookkeeping());
                        false
                    }
                    None => true,
                });
                if remaining.is_empty() || generator_idx >= dylib.generators.len() {
                    return Ok(result);
                }
                let generator = dylib.generators[generator_idx].clone();
                generator_idx += 1;
                generator
            };
            generator.try_to_generate(self, &remaining)?;
        }
    }

    /// Appends a fallback generator, consulted on lookup miss in insertion
    /// order.
    pub fn add_generator(&self, generator: impl DefinitionGenerator + 'static) {
        let mut guard = self.session.state.lock().unwrap();
        guard.dylib_mut(self.id).generators.push(Arc::new(generator));
    }
}

/// Splits a new definition's names into (prior weak definitions to discard,
/// the new definition's own names that lose to existing ones), or fails on a
/// strong collision.
fn classify_collisions(
    dylib: &DylibState,
    symbols: &SymbolFlagsMap,
) -> Result<(Vec<SymbolStringPtr>, SymbolNameSet), SessionError> {
    let mut existing_overridden = Vec::new();
    let mut new_overridden = SymbolNameSet::default();
    for (name, flags) in symbols {
        if let Some(entry) = dylib.symbols.get(name) {
            if flags.is_strong() {
                if entry.flags.is_strong() || entry.state > SymbolState::NeverSearched {
                    return Err(SessionError::DuplicateDefinition(name.clone()));
                }
                existing_overridden.push(name.clone());
            } else {
                new_overridden.insert(name.clone());
            }
        }
    }
    Ok((existing_overridden, new_overridden))
}
