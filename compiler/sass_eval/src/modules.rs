//! Module cache and merged forward tables.
//!
//! Every stylesheet loaded through `@use` or `@forward` (and the entry point)
//! becomes a [`Module`], cached by canonical path. A module owns the merged
//! tables of everything it re-exports through `@forward`; the resolver
//! consults them after the module's own root names.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use sass_ir::ast::{ForwardFilter, Stylesheet};
use sass_ir::{Address, ModuleId, Name, PerKind, ScopeArena, ScopeId, SlotKind, StringInterner};

use crate::errors::EvalError;
use crate::output::CssDeclaration;

/// A `@forward` waiting for its module to finish compiling.
#[derive(Clone, Debug)]
pub struct PendingForward {
    pub source: ModuleId,
    pub filter: Option<ForwardFilter>,
    pub prefix: Option<String>,
}

#[derive(Debug)]
pub struct Module {
    id: ModuleId,
    path: PathBuf,
    root: ScopeId,
    sheet: Arc<Stylesheet>,
    compiled: bool,
    output: Vec<CssDeclaration>,
    merged: PerKind<FxHashMap<Name, Address>>,
    pending_forwards: Vec<PendingForward>,
    upstream: Vec<ModuleId>,
}

impl Module {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Canonical path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn sheet(&self) -> Arc<Stylesheet> {
        Arc::clone(&self.sheet)
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Record the module's own output and mark it compiled.
    pub fn finish(&mut self, output: Vec<CssDeclaration>) {
        self.output = output;
        self.compiled = true;
    }

    /// Declarations produced by this module's own statements.
    pub fn output(&self) -> &[CssDeclaration] {
        &self.output
    }

    /// Address a forwarded member is exposed under.
    pub fn merged(&self, kind: SlotKind, name: Name) -> Option<Address> {
        self.merged.get(kind).get(&name).copied()
    }

    pub fn merged_names(&self, kind: SlotKind) -> impl Iterator<Item = (Name, Address)> + '_ {
        self.merged.get(kind).iter().map(|(&name, &address)| (name, address))
    }

    /// Modules this one `@use`s or `@forward`s, in first-load order.
    pub fn upstream(&self) -> &[ModuleId] {
        &self.upstream
    }

    pub fn add_upstream(&mut self, module: ModuleId) {
        if module != self.id && !self.upstream.contains(&module) {
            self.upstream.push(module);
        }
    }

    pub fn push_forward(&mut self, forward: PendingForward) {
        self.pending_forwards.push(forward);
    }

    pub fn take_forwards(&mut self) -> Vec<PendingForward> {
        std::mem::take(&mut self.pending_forwards)
    }
}

/// Path-keyed cache of every module of one compilation.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    by_path: FxHashMap<PathBuf, ModuleId>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    #[inline]
    pub fn get(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index()]
    }

    pub fn lookup(&self, path: &Path) -> Option<ModuleId> {
        self.by_path.get(path).copied()
    }

    /// Cache a freshly parsed module. Its root descriptor is tagged with the
    /// new id.
    pub fn insert(
        &mut self,
        path: PathBuf,
        sheet: Stylesheet,
        arena: &mut ScopeArena,
    ) -> Result<ModuleId, EvalError> {
        let raw = u32::try_from(self.modules.len()).map_err(|_| {
            EvalError::new(format!(
                "module graph exceeded capacity: {} modules",
                self.modules.len()
            ))
        })?;
        let id = ModuleId::from_raw(raw);
        arena.get_mut(sheet.root).set_module(id);
        self.by_path.insert(path.clone(), id);
        self.modules.push(Module {
            id,
            path,
            root: sheet.root,
            sheet: Arc::new(sheet),
            compiled: false,
            output: Vec::new(),
            merged: PerKind::default(),
            pending_forwards: Vec::new(),
            upstream: Vec::new(),
        });
        Ok(id)
    }

    /// Public members of `id`: its root's own names followed by everything it
    /// forwards.
    pub fn exports(
        &self,
        id: ModuleId,
        arena: &ScopeArena,
        interner: &StringInterner,
    ) -> Vec<(SlotKind, Name, Address)> {
        let module = self.get(id);
        let root = arena.get(module.root);
        let mut exports = Vec::new();
        for kind in SlotKind::ALL {
            exports.extend(
                root.names(kind)
                    .filter(|(name, _)| !interner.is_private(*name))
                    .map(|(name, address)| (kind, name, address)),
            );
            exports.extend(
                module
                    .merged_names(kind)
                    .filter(|(name, _)| root.get(kind, *name).is_none())
                    .map(|(name, address)| (kind, name, address)),
            );
        }
        exports
    }

    /// Merge the exports of `forward.source` into `target`'s forward tables.
    ///
    /// Returns the exposed name on a conflict: two forwards exposing the same
    /// name for different members.
    pub fn apply_forward(
        &mut self,
        target: ModuleId,
        forward: &PendingForward,
        arena: &ScopeArena,
        interner: &StringInterner,
    ) -> Result<(), Name> {
        let exports = self.exports(forward.source, arena, interner);
        let merged = &mut self.get_mut(target).merged;
        for (kind, name, address) in exports {
            let exposed = match &forward.prefix {
                Some(prefix) => interner.intern(&format!("{prefix}{}", interner.lookup(name))),
                None => name,
            };
            let admitted = match &forward.filter {
                Some(filter) => filter.admits(kind == SlotKind::Variable, exposed),
                None => true,
            };
            if !admitted {
                continue;
            }
            match merged.get_mut(kind).insert(exposed, address) {
                Some(previous) if previous != address => return Err(exposed),
                _ => {}
            }
        }
        Ok(())
    }

    /// Output of `entry` and everything upstream of it, dependencies first.
    pub fn css(&self, entry: ModuleId) -> Vec<CssDeclaration> {
        let mut visited = FxHashSet::default();
        let mut out = Vec::new();
        self.collect(entry, &mut visited, &mut out);
        out
    }

    fn collect(
        &self,
        id: ModuleId,
        visited: &mut FxHashSet<ModuleId>,
        out: &mut Vec<CssDeclaration>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let module = self.get(id);
        for &upstream in module.upstream() {
            self.collect(upstream, visited, out);
        }
        out.extend(module.output().iter().cloned());
    }
}
