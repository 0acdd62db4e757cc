//! Name resolution at evaluation time.
//!
//! Every lookup, whether for a variable, function, mixin or a namespaced
//! member, walks one ordered sequence of [`Candidate`] tables produced by
//! [`Candidates`]. For each descriptor on the lexical chain:
//!
//! 1. its own names, unless it is import-transparent;
//! 2. each root on its forwarded list (`@use ... as *`), public names only,
//!    followed by that module's merged forward tables;
//! 3. the merged forward tables of the module the descriptor belongs to.
//!
//! The walk then moves to the lexical parent, except after a module root
//! (roots never inherit from their call site) or, when pass-through is off,
//! after a descriptor that is neither permeable nor import-transparent. Full
//! lookups end with the built-ins.
//!
//! A table entry only counts when its slot is bound, so a declared but not yet
//! assigned binding lets the lookup fall through to a less local one. The
//! resolver reports absence but never raises errors; callers decide.

use smallvec::SmallVec;

use sass_ir::{Address, ModuleId, Name, ScopeArena, ScopeId, SlotKind, StringInterner};

use crate::environment::RuntimeEnvironment;
use crate::modules::ModuleGraph;

/// One table consulted during a lookup.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Candidate {
    /// Names declared directly in a descriptor.
    Own(ScopeId),
    /// Public names of a module root made visible without a namespace.
    Public(ScopeId),
    /// Merged forward tables of a module.
    Merged(ModuleId),
}

/// Ordered candidate tables for a lookup starting at one scope.
pub struct Candidates<'a> {
    arena: &'a ScopeArena,
    next: Option<ScopeId>,
    /// Candidates of the current descriptor, reversed.
    pending: SmallVec<[Candidate; 8]>,
    pass_through: bool,
    builtins_done: bool,
}

impl<'a> Candidates<'a> {
    pub fn new(arena: &'a ScopeArena, scope: ScopeId, pass_through: bool) -> Self {
        Candidates {
            arena,
            next: Some(scope),
            pending: SmallVec::new(),
            pass_through,
            builtins_done: false,
        }
    }

    fn expand(&mut self, id: ScopeId) {
        let descriptor = self.arena.get(id);
        if let Some(module) = descriptor.module() {
            self.pending.push(Candidate::Merged(module));
        }
        for &root in descriptor.forwarded().iter().rev() {
            if let Some(module) = self.arena.get(root).module() {
                self.pending.push(Candidate::Merged(module));
            }
            self.pending.push(Candidate::Public(root));
        }
        if !descriptor.is_import() {
            self.pending.push(Candidate::Own(id));
        }

        let continues = !descriptor.is_root()
            && (self.pass_through || descriptor.is_permeable() || descriptor.is_import());
        self.next = if continues { descriptor.parent() } else { None };
    }
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            if let Some(candidate) = self.pending.pop() {
                return Some(candidate);
            }
            match self.next.take() {
                Some(id) => self.expand(id),
                None if self.pass_through && !self.builtins_done => {
                    self.builtins_done = true;
                    return Some(Candidate::Own(ScopeId::BUILTINS));
                }
                None => return None,
            }
        }
    }
}

/// Outcome of a namespaced lookup (`ns.$name`, `ns.fn()`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NamespacedLookup {
    Found(Address),
    /// The module exists but exposes no such member.
    Missing,
    /// The member name is private to its module.
    Private,
    /// No `@use` registered the namespace on the scope chain.
    UnknownNamespace,
}

/// Read-only view over everything a lookup consults.
pub struct Resolver<'a> {
    pub arena: &'a ScopeArena,
    pub env: &'a RuntimeEnvironment,
    pub modules: &'a ModuleGraph,
    pub interner: &'a StringInterner,
}

impl<'a> Resolver<'a> {
    pub fn candidates(&self, scope: ScopeId, pass_through: bool) -> Candidates<'a> {
        Candidates::new(self.arena, scope, pass_through)
    }

    fn probe(&self, candidate: Candidate, kind: SlotKind, name: Name, private: bool) -> Option<Address> {
        let address = match candidate {
            Candidate::Own(id) => self.arena.get(id).get(kind, name),
            Candidate::Public(_) | Candidate::Merged(_) if private => None,
            Candidate::Public(root) => self.arena.get(root).get(kind, name),
            Candidate::Merged(module) => self.modules.get(module).merged(kind, name),
        }?;
        self.env.is_bound(kind, address).then_some(address)
    }

    /// Address of the nearest bound `name` visible from `scope`.
    ///
    /// With `pass_through == false` the walk stops at the first callable or
    /// style-rule boundary and skips the built-ins.
    pub fn resolve(
        &self,
        kind: SlotKind,
        name: Name,
        scope: ScopeId,
        pass_through: bool,
    ) -> Option<Address> {
        let private = self.interner.is_private(name);
        self.candidates(scope, pass_through)
            .find_map(|candidate| self.probe(candidate, kind, name, private))
    }

    /// Root and module registered under `namespace` on the chain from `scope`.
    pub fn find_namespace(&self, scope: ScopeId, namespace: Name) -> Option<(ScopeId, ModuleId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let descriptor = self.arena.get(id);
            if let Some(found) = descriptor.namespace(namespace) {
                return Some(found);
            }
            if descriptor.is_root() {
                return None;
            }
            current = descriptor.parent();
        }
        None
    }

    /// Look up `namespace.name` from `scope`.
    ///
    /// Only the namespaced module's public names and its forwards are
    /// consulted; the lexical chain never is.
    pub fn resolve_namespaced(
        &self,
        kind: SlotKind,
        namespace: Name,
        name: Name,
        scope: ScopeId,
    ) -> NamespacedLookup {
        let Some((root, module)) = self.find_namespace(scope, namespace) else {
            return NamespacedLookup::UnknownNamespace;
        };
        if self.interner.is_private(name) {
            return NamespacedLookup::Private;
        }
        [Candidate::Public(root), Candidate::Merged(module)]
            .into_iter()
            .find_map(|candidate| self.probe(candidate, kind, name, false))
            .map_or(NamespacedLookup::Missing, NamespacedLookup::Found)
    }
}

#[cfg(test)]
mod tests;
