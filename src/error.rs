// src/error.rs
//! Error kinds surfaced by session operations.

use miette::Diagnostic;
use thiserror::Error;

use crate::pool::SymbolStringPtr;
use crate::symbol::SymbolNameSet;

/// Failures reported by define, remove, and lookup paths.
///
/// Each kind is machine-matchable; the rendered message carries the affected
/// symbol names sorted for stable output.
#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    /// A non-weak collision on `define`.
    #[error("duplicate definition of symbol '{0}'")]
    #[diagnostic(code(stoat::duplicate_definition))]
    DuplicateDefinition(SymbolStringPtr),

    /// A lookup or removal named symbols absent from every searched dylib
    /// and generator.
    #[error("symbols not found: [{}]", join_names(.0))]
    #[diagnostic(code(stoat::symbols_not_found))]
    SymbolsNotFound(Vec<SymbolStringPtr>),

    /// Removal was attempted while the named symbols are in the
    /// materialization phase.
    #[error("symbols could not be removed: [{}]", join_names(.0))]
    #[diagnostic(code(stoat::symbols_could_not_be_removed))]
    SymbolsCouldNotBeRemoved(Vec<SymbolStringPtr>),

    /// A materializer reported failure; the named symbols and everything
    /// transitively depending on them are unusable.
    #[error("failed to materialize symbols: [{}]", join_names(.0))]
    #[diagnostic(code(stoat::failed_to_materialize))]
    FailedToMaterialize(Vec<SymbolStringPtr>),

    /// An opaque error, typically from a definition generator.
    #[error("{0}")]
    #[diagnostic(code(stoat::other))]
    Other(String),
}

impl SessionError {
    /// Builds [`SessionError::FailedToMaterialize`] with sorted names.
    pub(crate) fn failed_to_materialize(names: &SymbolNameSet) -> Self {
        SessionError::FailedToMaterialize(sorted(names))
    }

    /// The symbols this error is about, if it carries any.
    pub fn symbols(&self) -> &[SymbolStringPtr] {
        match self {
            SessionError::DuplicateDefinition(name) => std::slice::from_ref(name),
            SessionError::SymbolsNotFound(names)
            | SessionError::SymbolsCouldNotBeRemoved(names)
            | SessionError::FailedToMaterialize(names) => names,
            SessionError::Other(_) => &[],
        }
    }
}

pub(crate) fn sorted(names: &SymbolNameSet) -> Vec<SymbolStringPtr> {
    let mut names: Vec<_> = names.iter().cloned().collect();
    names.sort();
    names
}

fn join_names(names: &[SymbolStringPtr]) -> String {
    let mut out = String::new();
    for (idx, name) in names.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        out.push_str(name.as_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SymbolStringPool;

    #[test]
    fn messages_list_symbol_names() {
        let pool = SymbolStringPool::new();
        let err = SessionError::SymbolsNotFound(vec![pool.intern("bar"), pool.intern("foo")]);
        assert_eq!(err.to_string(), "symbols not found: [bar, foo]");
        assert_eq!(err.symbols().len(), 2);
    }

    #[test]
    fn duplicate_definition_names_the_symbol() {
        let pool = SymbolStringPool::new();
        let err = SessionError::DuplicateDefinition(pool.intern("foo"));
        assert_eq!(err.to_string(), "duplicate definition of symbol 'foo'");
    }
}
