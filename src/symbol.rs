// src/symbol.rs
//! Symbol flags, states, and evaluated addresses.

use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::pool::SymbolStringPtr;

bitflags! {
    /// Per-symbol attribute bits.
    ///
    /// `EXPORTED`, `WEAK` and `CALLABLE` are supplied by whoever defines the
    /// symbol. `MATERIALIZING` and `LAZY` are engine bookkeeping and are
    /// stripped from every flag set handed back to callers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SymbolFlags: u8 {
        /// Visible to lookups that search exported symbols only.
        const EXPORTED = 1 << 0;

        /// May be superseded by a later strong definition of the same name.
        const WEAK = 1 << 1;

        /// The symbol's address points at executable code.
        const CALLABLE = 1 << 2;

        /// A materializer currently owns this symbol.
        const MATERIALIZING = 1 << 3;

        /// Defined but not yet searched; its unit has not been dispatched.
        const LAZY = 1 << 4;
    }
}

impl SymbolFlags {
    pub fn is_strong(&self) -> bool {
        !self.contains(SymbolFlags::WEAK)
    }

    pub fn is_weak(&self) -> bool {
        self.contains(SymbolFlags::WEAK)
    }

    pub fn is_exported(&self) -> bool {
        self.contains(SymbolFlags::EXPORTED)
    }

    /// Flags as reported to callers, with engine bookkeeping bits cleared.
    pub(crate) fn without_bookkeeping(self) -> Self {
        self - (SymbolFlags::MATERIALIZING | SymbolFlags::LAZY)
    }
}

/// Lifecycle phase of a symbol table entry.
///
/// States on the non-failure path are strictly ordered; a lookup's required
/// state is met by any entry at or past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolState {
    /// Materialization failed; the entry is being torn down.
    Invalid,
    /// Defined, but no lookup has touched it yet.
    NeverSearched,
    /// Its materialization unit has been dispatched.
    Materializing,
    /// An address has been assigned.
    Resolved,
    /// Its bytes are in place; dependencies may still be in flight.
    Emitted,
    /// Safe to use: emitted, and every transitive dependency is emitted.
    Ready,
}

/// An address paired with the flags the definer supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatedSymbol {
    pub address: u64,
    pub flags: SymbolFlags,
}

impl EvaluatedSymbol {
    pub fn new(address: u64, flags: SymbolFlags) -> Self {
        Self { address, flags }
    }
}

pub type SymbolNameSet = FxHashSet<SymbolStringPtr>;
pub type SymbolMap = FxHashMap<SymbolStringPtr, EvaluatedSymbol>;
pub type SymbolFlagsMap = FxHashMap<SymbolStringPtr, SymbolFlags>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_ordered_along_the_success_path() {
        assert!(SymbolState::NeverSearched < SymbolState::Materializing);
        assert!(SymbolState::Materializing < SymbolState::Resolved);
        assert!(SymbolState::Resolved < SymbolState::Emitted);
        assert!(SymbolState::Emitted < SymbolState::Ready);
    }

    #[test]
    fn bookkeeping_bits_are_stripped() {
        let flags = SymbolFlags::EXPORTED | SymbolFlags::MATERIALIZING | SymbolFlags::LAZY;
        assert_eq!(flags.without_bookkeeping(), SymbolFlags::EXPORTED);
    }

    #[test]
    fn weak_and_strong_are_complementary() {
        assert!(SymbolFlags::EXPORTED.is_strong());
        assert!((SymbolFlags::EXPORTED | SymbolFlags::WEAK).is_weak());
    }
}
