//! Storage addresses assigned to declarations.
//!
//! Every variable, function and mixin declaration is given an [`Address`] while
//! the stylesheet is parsed. The address never changes afterwards and is baked
//! into the AST nodes that refer to it.

use std::fmt;

/// Identifier of one lexical scope (and of its storage frame).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The descriptor holding the built-in functions and mixins.
    pub const BUILTINS: ScopeId = ScopeId(0);

    /// Create from a raw arena index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ScopeId(raw)
    }

    /// Arena index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a loaded module in the module graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Create from a raw graph index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ModuleId(raw)
    }

    /// Graph index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Location of a binding.
///
/// `Global` slots live for the whole compilation (built-ins and the roots of
/// stylesheets). `Local` slots exist only while an activation of `frame` is
/// open; `offset` is relative to that activation's base.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    Global(u32),
    Local { frame: ScopeId, offset: u32 },
}

impl Address {
    /// Whether this address lives in the permanent address space.
    #[inline]
    pub fn is_global(self) -> bool {
        matches!(self, Address::Global(_))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Global(offset) => write!(f, "global[{offset}]"),
            Address::Local { frame, offset } => write!(f, "frame{}[{offset}]", frame.0),
        }
    }
}

/// The three separate namespaces Sass keeps per scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Variable,
    Function,
    Mixin,
}

impl SlotKind {
    /// All kinds, in storage order.
    pub const ALL: [SlotKind; 3] = [SlotKind::Variable, SlotKind::Function, SlotKind::Mixin];

    /// Index into per-kind arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            SlotKind::Variable => 0,
            SlotKind::Function => 1,
            SlotKind::Mixin => 2,
        }
    }

    /// Human-readable noun used in diagnostics.
    pub fn noun(self) -> &'static str {
        match self {
            SlotKind::Variable => "variable",
            SlotKind::Function => "function",
            SlotKind::Mixin => "mixin",
        }
    }
}

/// One counter (or table) per [`SlotKind`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PerKind<T> {
    items: [T; 3],
}

impl<T> PerKind<T> {
    /// Build from a function of the kind.
    pub fn from_fn(f: impl FnMut(SlotKind) -> T) -> Self {
        PerKind {
            items: SlotKind::ALL.map(f),
        }
    }

    /// Borrow the entry for `kind`.
    #[inline]
    pub fn get(&self, kind: SlotKind) -> &T {
        &self.items[kind.index()]
    }

    /// Mutably borrow the entry for `kind`.
    #[inline]
    pub fn get_mut(&mut self, kind: SlotKind) -> &mut T {
        &mut self.items[kind.index()]
    }

    /// Iterate `(kind, entry)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKind, &T)> {
        SlotKind::ALL.into_iter().zip(self.items.iter())
    }
}
