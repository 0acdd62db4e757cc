//! Scope descriptors and the parse-time address allocator.
//!
//! A [`ScopeDescriptor`] is created for every block that can declare names
//! (stylesheet root, style rule, control-flow body, callable body, imported
//! stylesheet). All descriptors of a compilation live in one [`ScopeArena`];
//! AST nodes refer to them by [`ScopeId`].
//!
//! The grammar parser drives a [`ScopeAllocator`] while it walks the source:
//! it enters and exits scopes and asks for an [`Address`] for every
//! declaration, embedding the result in the AST.
//!
//! # Address assignment
//!
//! - Declarations in a root descriptor get `Address::Global`, numbered by a
//!   per-kind counter shared by the whole compilation.
//! - Declarations anywhere else get `Address::Local` with the next offset of
//!   that descriptor's frame.
//! - Import-transparent descriptors never own bindings: declarations are
//!   redirected to the nearest ancestor that is not import-transparent.
//! - Re-declaring a name returns the address it already has, except for
//!   functions and mixins whose existing address is a built-in slot below the
//!   private boundary; those get a fresh slot so user code can shadow them.

use std::fmt;

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{Address, ModuleId, Name, PerKind, ScopeId, SlotKind};

/// Error when the arena runs out of descriptor ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeOverflow {
    pub count: usize,
}

impl fmt::Display for ScopeOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope arena exceeded capacity: {} descriptors", self.count)
    }
}

impl std::error::Error for ScopeOverflow {}

bitflags! {
    /// Behavioural flags of a scope descriptor.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ScopeFlags: u8 {
        /// Stylesheet or module root. Declarations allocate in the global space
        /// and lookups never continue past it.
        const ROOT = 1;
        /// Plain assignments reach the parent (`@if`, `@for`, `@each`, `@while`).
        const PERMEABLE = 1 << 1;
        /// Invisible as a scope: lookups skip its own maps.
        const IMPORT = 1 << 2;
        /// Function or mixin body.
        const CALLABLE = 1 << 3;
    }
}

/// Per-lexical-block record of declared names plus the runtime link state
/// populated by module rules.
#[derive(Clone, Debug)]
pub struct ScopeDescriptor {
    parent: Option<ScopeId>,
    flags: ScopeFlags,
    module: Option<ModuleId>,
    names: PerKind<FxHashMap<Name, Address>>,
    local_counts: PerKind<u32>,
    forwarded: SmallVec<[ScopeId; 2]>,
    namespaces: FxHashMap<Name, (ScopeId, ModuleId)>,
    active: bool,
}

impl ScopeDescriptor {
    fn new(parent: Option<ScopeId>, flags: ScopeFlags) -> Self {
        ScopeDescriptor {
            parent,
            flags,
            module: None,
            names: PerKind::default(),
            local_counts: PerKind::default(),
            forwarded: SmallVec::new(),
            namespaces: FxHashMap::default(),
            active: false,
        }
    }

    /// Lexically enclosing descriptor.
    #[inline]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Behavioural flags.
    #[inline]
    pub fn flags(&self) -> ScopeFlags {
        self.flags
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.flags.contains(ScopeFlags::ROOT)
    }

    #[inline]
    pub fn is_permeable(&self) -> bool {
        self.flags.contains(ScopeFlags::PERMEABLE)
    }

    #[inline]
    pub fn is_import(&self) -> bool {
        self.flags.contains(ScopeFlags::IMPORT)
    }

    /// Module owning this descriptor (set on module roots).
    #[inline]
    pub fn module(&self) -> Option<ModuleId> {
        self.module
    }

    pub fn set_module(&mut self, module: ModuleId) {
        self.module = Some(module);
    }

    /// Address of a name declared directly in this descriptor.
    #[inline]
    pub fn get(&self, kind: SlotKind, name: Name) -> Option<Address> {
        self.names.get(kind).get(&name).copied()
    }

    /// All names of one kind declared directly in this descriptor.
    pub fn names(&self, kind: SlotKind) -> impl Iterator<Item = (Name, Address)> + '_ {
        self.names.get(kind).iter().map(|(&name, &addr)| (name, addr))
    }

    /// Number of local slots of `kind` an activation of this frame needs.
    #[inline]
    pub fn local_count(&self, kind: SlotKind) -> u32 {
        *self.local_counts.get(kind)
    }

    /// Whether an activation needs any local storage at all.
    pub fn has_locals(&self) -> bool {
        self.local_counts.iter().any(|(_, &count)| count > 0)
    }

    /// Module roots made visible here by `@use ... as *` or `@import`.
    #[inline]
    pub fn forwarded(&self) -> &[ScopeId] {
        &self.forwarded
    }

    /// Append a module root to the plain-lookup list. Duplicates are ignored.
    pub fn push_forwarded(&mut self, root: ScopeId) {
        if !self.forwarded.contains(&root) {
            self.forwarded.push(root);
        }
    }

    /// Module registered under `namespace` in this descriptor.
    #[inline]
    pub fn namespace(&self, namespace: Name) -> Option<(ScopeId, ModuleId)> {
        self.namespaces.get(&namespace).copied()
    }

    /// Register a namespace. Returns the existing registration if `namespace`
    /// is already taken, leaving it unchanged.
    pub fn register_namespace(
        &mut self,
        namespace: Name,
        root: ScopeId,
        module: ModuleId,
    ) -> Result<(), (ScopeId, ModuleId)> {
        match self.namespaces.get(&namespace) {
            Some(&existing) => Err(existing),
            None => {
                self.namespaces.insert(namespace, (root, module));
                Ok(())
            }
        }
    }

    /// Whether an activation of this descriptor is currently open.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Set the active mark, returning the previous value.
    pub fn set_active(&mut self, active: bool) -> bool {
        std::mem::replace(&mut self.active, active)
    }
}

/// Owner of every scope descriptor of one compilation, plus the counters of
/// the global address space.
#[derive(Clone, Debug)]
pub struct ScopeArena {
    scopes: Vec<ScopeDescriptor>,
    global_counts: PerKind<u32>,
    private_boundary: PerKind<u32>,
}

impl ScopeArena {
    /// Create an arena holding only the built-in descriptor.
    pub fn new() -> Self {
        ScopeArena {
            scopes: vec![ScopeDescriptor::new(None, ScopeFlags::ROOT)],
            global_counts: PerKind::default(),
            private_boundary: PerKind::default(),
        }
    }

    /// Try to allocate a new descriptor, returning an error on overflow.
    pub fn try_alloc(
        &mut self,
        parent: Option<ScopeId>,
        flags: ScopeFlags,
    ) -> Result<ScopeId, ScopeOverflow> {
        let raw = u32::try_from(self.scopes.len()).map_err(|_| ScopeOverflow {
            count: self.scopes.len(),
        })?;
        self.scopes.push(ScopeDescriptor::new(parent, flags));
        Ok(ScopeId::from_raw(raw))
    }

    /// Allocate a new descriptor.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` descriptors are allocated. Use
    /// `try_alloc` for fallible allocation.
    pub fn alloc(&mut self, parent: Option<ScopeId>, flags: ScopeFlags) -> ScopeId {
        self.try_alloc(parent, flags).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Try to allocate a root descriptor for a stylesheet.
    pub fn try_alloc_root(&mut self) -> Result<ScopeId, ScopeOverflow> {
        self.try_alloc(None, ScopeFlags::ROOT)
    }

    /// Allocate a root descriptor for a stylesheet.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` descriptors are allocated.
    pub fn alloc_root(&mut self) -> ScopeId {
        self.alloc(None, ScopeFlags::ROOT)
    }

    /// Borrow a descriptor.
    #[inline]
    pub fn get(&self, id: ScopeId) -> &ScopeDescriptor {
        &self.scopes[id.index()]
    }

    /// Mutably borrow a descriptor.
    #[inline]
    pub fn get_mut(&mut self, id: ScopeId) -> &mut ScopeDescriptor {
        &mut self.scopes[id.index()]
    }

    /// Number of descriptors, including the built-in one.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Always false: the built-in descriptor always exists.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of global slots of `kind` allocated so far.
    #[inline]
    pub fn global_count(&self, kind: SlotKind) -> u32 {
        *self.global_counts.get(kind)
    }

    /// Global offsets of `kind` below this value belong to built-ins.
    #[inline]
    pub fn private_boundary(&self, kind: SlotKind) -> u32 {
        *self.private_boundary.get(kind)
    }

    /// Freeze the built-in region: everything allocated so far becomes
    /// read-only for user code.
    pub fn seal_builtins(&mut self) {
        self.private_boundary = self.global_counts.clone();
    }

    /// Nearest descriptor (self included) that is not import-transparent.
    pub fn storage_scope(&self, mut id: ScopeId) -> ScopeId {
        loop {
            let scope = self.get(id);
            match scope.parent {
                Some(parent) if scope.is_import() => id = parent,
                _ => return id,
            }
        }
    }

    /// Nearest root descriptor (self included).
    pub fn root_of(&self, mut id: ScopeId) -> ScopeId {
        loop {
            let scope = self.get(id);
            match scope.parent {
                Some(parent) if !scope.is_root() => id = parent,
                _ => return id,
            }
        }
    }

    /// Register `name` in `scope` and return its address.
    pub fn declare(&mut self, scope: ScopeId, kind: SlotKind, name: Name) -> Address {
        let target = self.storage_scope(scope);
        let boundary = self.private_boundary(kind);

        if let Some(existing) = self.get(target).get(kind, name) {
            let reusable = match (kind, existing) {
                (SlotKind::Variable, _) | (_, Address::Local { .. }) => true,
                (_, Address::Global(offset)) => offset >= boundary,
            };
            if reusable {
                return existing;
            }
        }

        let address = if self.get(target).is_root() {
            let counter = self.global_counts.get_mut(kind);
            let offset = *counter;
            *counter += 1;
            Address::Global(offset)
        } else {
            let counter = self.get_mut(target).local_counts.get_mut(kind);
            let offset = *counter;
            *counter += 1;
            Address::Local {
                frame: target,
                offset,
            }
        };

        self.get_mut(target).names.get_mut(kind).insert(name, address);
        tracing::trace!(?kind, ?name, %address, "declared");
        address
    }

    /// Address of `name` declared directly in `scope` (after import redirection).
    pub fn find_local(&self, scope: ScopeId, kind: SlotKind, name: Name) -> Option<Address> {
        self.get(self.storage_scope(scope)).get(kind, name)
    }

    /// Parse-time lookup along the lexical chain.
    ///
    /// With `pass_through == false` the walk stops after the first descriptor
    /// that is neither permeable nor import-transparent. Root descriptors
    /// always end the walk; a full walk then falls back to the built-ins.
    pub fn find(
        &self,
        scope: ScopeId,
        kind: SlotKind,
        name: Name,
        pass_through: bool,
    ) -> Option<Address> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let descriptor = self.get(id);
            if !descriptor.is_import() {
                if let Some(address) = descriptor.get(kind, name) {
                    return Some(address);
                }
            }
            if descriptor.is_root() {
                break;
            }
            if !pass_through && !descriptor.is_permeable() && !descriptor.is_import() {
                return None;
            }
            current = descriptor.parent;
        }
        if pass_through {
            return self.get(ScopeId::BUILTINS).get(kind, name);
        }
        None
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor over a [`ScopeArena`] used by the grammar parser.
///
/// Tracks the stack of scopes the parser is currently inside and forwards
/// declarations to the innermost one.
pub struct ScopeAllocator<'a> {
    arena: &'a mut ScopeArena,
    stack: Vec<ScopeId>,
}

impl<'a> ScopeAllocator<'a> {
    /// Start allocating inside `scope`.
    pub fn new(arena: &'a mut ScopeArena, scope: ScopeId) -> Self {
        ScopeAllocator {
            arena,
            stack: vec![scope],
        }
    }

    /// Innermost scope.
    #[inline]
    pub fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeId::BUILTINS)
    }

    /// Underlying arena.
    pub fn arena(&self) -> &ScopeArena {
        self.arena
    }

    /// Mutable access to the underlying arena.
    pub fn arena_mut(&mut self) -> &mut ScopeArena {
        self.arena
    }

    /// Open a nested scope and make it current.
    pub fn enter(&mut self, flags: ScopeFlags) -> ScopeId {
        let id = self.arena.alloc(Some(self.current()), flags);
        self.stack.push(id);
        id
    }

    /// Close the innermost scope. The starting scope is never popped.
    pub fn exit(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    pub fn declare_variable(&mut self, name: Name) -> Address {
        self.arena.declare(self.current(), SlotKind::Variable, name)
    }

    pub fn declare_function(&mut self, name: Name) -> Address {
        self.arena.declare(self.current(), SlotKind::Function, name)
    }

    pub fn declare_mixin(&mut self, name: Name) -> Address {
        self.arena.declare(self.current(), SlotKind::Mixin, name)
    }

    pub fn find_local_address(&self, kind: SlotKind, name: Name) -> Option<Address> {
        self.arena.find_local(self.current(), kind, name)
    }

    pub fn find_address(&self, kind: SlotKind, name: Name, pass_through: bool) -> Option<Address> {
        self.arena.find(self.current(), kind, name, pass_through)
    }

    /// Address a plain (`global == false`) or `!global` assignment writes to.
    ///
    /// Plain assignments reuse a binding reachable through permeable scopes and
    /// otherwise declare a new one in the current scope. `!global` assignments
    /// always target the root of the current chain.
    pub fn assignment_target(&mut self, name: Name, global: bool) -> Address {
        let current = self.current();
        if global {
            let root = self.arena.root_of(current);
            return self.arena.declare(root, SlotKind::Variable, name);
        }
        match self.arena.find(current, SlotKind::Variable, name, false) {
            Some(address) => address,
            None => self.arena.declare(current, SlotKind::Variable, name),
        }
    }
}

#[cfg(test)]
mod tests;
