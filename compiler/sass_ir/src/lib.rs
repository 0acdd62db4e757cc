//! Sass IR - names, addresses, scope descriptors and the syntax tree.
//!
//! This crate holds everything that is decided while a stylesheet is parsed:
//!
//! - [`Name`] / [`StringInterner`]: interned identifiers
//! - [`Address`]: where a declaration lives (`Global` or `Local` to a frame)
//! - [`ScopeArena`] / [`ScopeAllocator`]: lexical scope descriptors and the
//!   address allocator the parser calls for every declaration
//! - [`ast`]: the tree the evaluator walks, with addresses baked in
//! - [`Value`]: the minimal value model stored in slots

mod address;
pub mod ast;
mod interner;
mod name;
pub mod scope;
mod value;

pub use address::{Address, ModuleId, PerKind, ScopeId, SlotKind};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
pub use scope::{ScopeAllocator, ScopeArena, ScopeDescriptor, ScopeFlags, ScopeOverflow};
pub use value::{ListIter, Value};
