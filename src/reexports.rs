// src/reexports.rs
//! Aliases and cross-dylib re-exports, built on the materialization core.
//!
//! An alias resolves to its aliasee's address under the alias's own flags
//! and depends on the aliasee for readiness. Aliasees that are themselves
//! pending aliases of the same unit are resolved in waves: each wave looks
//! up the aliasees that are available, resolves its aliases, and unlocks the
//! next wave. A wave that cannot make progress means the aliases form a
//! cycle, which fails the unit.

use rustc_hash::FxHashMap;

use crate::dylib::{DefinitionGenerator, JITDylib, SymbolDependenceMap};
use crate::error::SessionError;
use crate::pool::SymbolStringPtr;
use crate::responsibility::MaterializationResponsibility;
use crate::symbol::{EvaluatedSymbol, SymbolFlags, SymbolFlagsMap, SymbolMap, SymbolNameSet, SymbolState};
use crate::unit::MaterializationUnit;

/// Target of one alias: the name it forwards to and the flags the alias
/// itself carries.
#[derive(Debug, Clone)]
pub struct SymbolAlias {
    pub aliasee: SymbolStringPtr,
    pub flags: SymbolFlags,
}

impl SymbolAlias {
    pub fn new(aliasee: SymbolStringPtr, flags: SymbolFlags) -> Self {
        Self { aliasee, flags }
    }
}

pub type SymbolAliasMap = FxHashMap<SymbolStringPtr, SymbolAlias>;

/// Aliases within the defining dylib itself.
pub fn symbol_aliases(aliases: SymbolAliasMap) -> ReExportsMaterializationUnit {
    ReExportsMaterializationUnit::new(None, aliases)
}

/// Re-exports of symbols provided by `source`.
pub fn reexports(source: &JITDylib, aliases: SymbolAliasMap) -> ReExportsMaterializationUnit {
    ReExportsMaterializationUnit::new(Some(source.clone()), aliases)
}

pub struct ReExportsMaterializationUnit {
    source: Option<JITDylib>,
    aliases: SymbolAliasMap,
    flags: SymbolFlagsMap,
}

impl ReExportsMaterializationUnit {
    fn new(source: Option<JITDylib>, aliases: SymbolAliasMap) -> Self {
        let flags = aliases
            .iter()
            .map(|(name, alias)| (name.clone(), alias.flags))
            .collect();
        Self {
            source,
            aliases,
            flags,
        }
    }
}

impl MaterializationUnit for ReExportsMaterializationUnit {
    fn name(&self) -> &str {
        "<reexports>"
    }

    fn symbols(&self) -> &SymbolFlagsMap {
        &self.flags
    }

    fn materialize(self: Box<Self>, mut r: MaterializationResponsibility) {
        let ReExportsMaterializationUnit {
            source, aliases, ..
        } = *self;
        let mut pending = aliases;

        // Only materialize what is being waited on; everything else goes
        // back to the dylib for a later lookup.
        let requested = r.get_requested_symbols();
        if !requested.is_empty() {
            let deferred: SymbolAliasMap = pending
                .iter()
                .filter(|(name, _)| !requested.contains(*name))
                .map(|(name, alias)| (name.clone(), alias.clone()))
                .collect();
            if !deferred.is_empty() {
                pending.retain(|name, _| requested.contains(name));
                r.replace(ReExportsMaterializationUnit::new(source.clone(), deferred));
            }
        }

        let source = source.unwrap_or_else(|| r.target_dylib().clone());
        resolve_next_wave(AliasResolution { r, source, pending });
    }

    fn discard(&mut self, _dylib: &JITDylib, name: &SymbolStringPtr) {
        self.aliases.remove(name);
        self.flags.remove(name);
    }
}

struct AliasResolution {
    r: MaterializationResponsibility,
    source: JITDylib,
    pending: SymbolAliasMap,
}

fn resolve_next_wave(mut state: AliasResolution) {
    if state.pending.is_empty() {
        state.r.notify_emitted();
        return;
    }

    // An aliasee that is itself a pending alias of this unit cannot be
    // looked up yet; it becomes available once an earlier wave resolves it.
    let same_dylib = state.source == *state.r.target_dylib();
    let wave_names: Vec<SymbolStringPtr> = state
        .pending
        .iter()
        .filter(|(_, alias)| !(same_dylib && state.pending.contains_key(&alias.aliasee)))
        .map(|(name, _)| name.clone())
        .collect();

    if wave_names.is_empty() {
        tracing::debug!(dylib = %state.r.target_dylib().name(), "alias cycle, failing unit");
        state.r.fail_materialization();
        return;
    }

    let mut wave = Vec::with_capacity(wave_names.len());
    let mut aliasees = SymbolNameSet::default();
    for name in wave_names {
        let alias = state.pending.remove(&name).expect("wave name came from pending");
        aliasees.insert(alias.aliasee.clone());
        wave.push((name, alias));
    }

    let session = state.source.session();
    let source = state.source.clone();
    session.lookup(
        &[(source.clone(), true)],
        aliasees.clone(),
        SymbolState::Resolved,
        Box::new(move |result| {
            let addresses = match result {
                Ok(addresses) => addresses,
                Err(err) => {
                    tracing::debug!(error = %err, "aliasee lookup failed, failing re-export unit");
                    state.r.fail_materialization();
                    return;
                }
            };

            let mut dependencies = SymbolDependenceMap::default();
            dependencies.insert(source, aliasees);
            state.r.add_dependencies_for_all(&dependencies);

            let mut resolved = SymbolMap::default();
            for (name, alias) in &wave {
                let aliasee = addresses
                    .get(&alias.aliasee)
                    .expect("aliasee missing from successful lookup");
                resolved.insert(name.clone(), EvaluatedSymbol::new(aliasee.address, alias.flags));
            }
            state.r.notify_resolved(resolved);
            resolve_next_wave(state);
        }),
        None,
    );
}

type AllowFn = Box<dyn Fn(&SymbolStringPtr) -> bool + Send + Sync>;

/// Generator reflecting a source dylib's symbols into the dylib it is
/// attached to, as re-exports defined on demand.
pub struct ReexportsGenerator {
    source: JITDylib,
    match_non_exported: bool,
    allow: Option<AllowFn>,
}

impl ReexportsGenerator {
    pub fn new(source: &JITDylib, match_non_exported: bool) -> Self {
        Self {
            source: source.clone(),
            match_non_exported,
            allow: None,
        }
    }

    /// Restricts the generator to names the filter accepts.
    pub fn with_filter(
        mut self,
        allow: impl Fn(&SymbolStringPtr) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.allow = Some(Box::new(allow));
        self
    }
}

impl DefinitionGenerator for ReexportsGenerator {
    fn try_to_generate(
        &self,
        dylib: &JITDylib,
        names: &SymbolNameSet,
    ) -> Result<SymbolNameSet, SessionError> {
        let candidates: SymbolNameSet = names
            .iter()
            .filter(|name| self.allow.as_ref().map_or(true, |allow| allow(name)))
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Ok(SymbolNameSet::default());
        }

        let found = self.source.lookup_flags(&candidates)?;
        let mut aliases = SymbolAliasMap::default();
        let mut produced = SymbolNameSet::default();
        for (name, flags) in found {
            if !self.match_non_exported && !flags.is_exported() {
                continue;
            }
            produced.insert(name.clone());
            aliases.insert(name.clone(), SymbolAlias::new(name, flags));
        }
        if aliases.is_empty() {
            return Ok(SymbolNameSet::default());
        }

        tracing::debug!(
            source = %self.source.name(),
            target = %dylib.name(),
            symbols = aliases.len(),
            "defining re-exports on demand"
        );
        dylib.define(reexports(&self.source, aliases))?;
        Ok(produced)
    }
}
