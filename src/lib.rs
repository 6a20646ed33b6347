// src/lib.rs
//! Symbol resolution and materialization core for JIT linking.
//!
//! Named symbols live in [`JITDylib`] namespaces and are produced on demand
//! by [`MaterializationUnit`]s. Asynchronous lookups issued through the
//! [`ExecutionSession`] complete once every requested symbol reaches the
//! required state, with inter-symbol dependencies (including cycles) tracked
//! so that readiness and failure both propagate correctly.

mod dependence;
mod query;

pub mod dylib;
pub mod error;
pub mod pool;
pub mod reexports;
pub mod responsibility;
pub mod session;
pub mod symbol;
pub mod unit;

pub use dylib::{DefinitionGenerator, JITDylib, SymbolDependenceMap};
pub use error::SessionError;
pub use pool::{SymbolStringPool, SymbolStringPtr};
pub use query::NotifyComplete;
pub use reexports::{
    reexports, symbol_aliases, ReExportsMaterializationUnit, ReexportsGenerator, SymbolAlias,
    SymbolAliasMap,
};
pub use responsibility::MaterializationResponsibility;
pub use session::{
    DispatchMaterialization, ExecutionSession, MaterializationTask, RegisterDependencies,
};
pub use symbol::{
    EvaluatedSymbol, SymbolFlags, SymbolFlagsMap, SymbolMap, SymbolNameSet, SymbolState,
};
pub use unit::{MaterializationUnit, SimpleMaterializationUnit};
