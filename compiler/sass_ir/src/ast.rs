//! Statement and expression tree consumed by the evaluator.
//!
//! The tree is produced by the grammar parser (or by [`StylesheetBuilder`],
//! which issues the same allocator calls a parser would). Every node that
//! introduces a scope carries the [`ScopeId`] of its descriptor; every
//! reference carries the scope it appears in plus an optional pre-resolved
//! [`Address`] used as the static-binding fast path.

mod builder;

pub use builder::StylesheetBuilder;

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::{Address, Name, ScopeId, Value};

/// A parsed stylesheet: its root descriptor and top-level statements.
#[derive(Clone, Debug)]
pub struct Stylesheet {
    pub root: ScopeId,
    pub body: Vec<Stmt>,
}

/// Statements of one scope-introducing block.
#[derive(Clone, Debug)]
pub struct Block {
    pub scope: ScopeId,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    /// `$name: value [!default] [!global]`
    Assign(Assignment),
    /// `property: value` inside a style rule.
    Declaration { property: String, value: Expr, scope: ScopeId },
    /// `selector { ... }`
    StyleRule { selector: String, body: Block },
    /// `@if ... @else if ... @else ...`
    If {
        clauses: Vec<(Expr, Block)>,
        otherwise: Option<Block>,
    },
    /// `@for $var from <from> through|to <to>`
    For {
        variable: Address,
        from: Expr,
        to: Expr,
        inclusive: bool,
        body: Block,
    },
    /// `@each $var in <list>`
    Each {
        variable: Address,
        list: Expr,
        body: Block,
    },
    /// `@while <condition>`
    While { condition: Expr, body: Block },
    /// `@function name(...)`
    Function(Arc<CallableDecl>),
    /// `@mixin name(...)`
    Mixin(Arc<CallableDecl>),
    /// `@return <value>`
    Return(Expr),
    /// `@include name(...) [{ content }]`
    Include(Include),
    /// `@content`
    Content { scope: ScopeId },
    /// `@use`
    Use(UseRule),
    /// `@forward`
    Forward(ForwardRule),
    /// `@import`
    Import(ImportRule),
}

/// Variable assignment with its statically assigned target.
#[derive(Clone, Debug)]
pub struct Assignment {
    pub name: Name,
    pub scope: ScopeId,
    pub address: Address,
    pub value: Expr,
    /// `!default`: only write when the slot is empty or null.
    pub guarded: bool,
    pub global: bool,
}

/// Body and signature of a `@function` or `@mixin`.
#[derive(Debug)]
pub struct CallableDecl {
    pub name: Name,
    /// Slot the declaration is stored in.
    pub address: Address,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: Name,
    /// Local slot in the callable body's frame.
    pub address: Address,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug)]
pub struct Include {
    pub callee: Reference,
    pub args: Vec<Expr>,
    pub content: Option<Arc<Block>>,
}

/// A use of a variable, function or mixin name.
#[derive(Clone, Debug)]
pub struct Reference {
    pub name: Name,
    /// `ns` in `ns.$name`; namespaced references are always resolved dynamically.
    pub namespace: Option<Name>,
    /// Scope the reference appears in.
    pub scope: ScopeId,
    /// Address resolved while parsing, if any.
    pub address: Option<Address>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Literal(Value),
    Variable(Reference),
    Call { callee: Reference, args: Vec<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    List(Vec<Expr>),
}

/// How a `@use` exposes its module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UseNamespace {
    /// Namespace derived from the URL's last segment.
    Default,
    /// `as name`
    Named(Name),
    /// `as *`
    Global,
}

/// One `$name: value [!default]` entry of a `with(...)` clause.
#[derive(Clone, Debug)]
pub struct ConfigArg {
    pub name: Name,
    pub value: Expr,
    pub guarded: bool,
}

#[derive(Clone, Debug)]
pub struct UseRule {
    pub url: String,
    pub namespace: UseNamespace,
    pub config: Vec<ConfigArg>,
    pub scope: ScopeId,
}

/// Members named in a `show` or `hide` clause.
///
/// Variables are listed with `$`, functions and mixins without.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberSet {
    pub variables: FxHashSet<Name>,
    pub callables: FxHashSet<Name>,
}

impl MemberSet {
    /// Whether the set names `name` for a member of the given kind.
    pub fn contains(&self, is_variable: bool, name: Name) -> bool {
        if is_variable {
            self.variables.contains(&name)
        } else {
            self.callables.contains(&name)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForwardFilter {
    Show(MemberSet),
    Hide(MemberSet),
}

impl ForwardFilter {
    /// Whether a member with the exposed name `name` passes the filter.
    pub fn admits(&self, is_variable: bool, name: Name) -> bool {
        match self {
            ForwardFilter::Show(set) => set.contains(is_variable, name),
            ForwardFilter::Hide(set) => !set.contains(is_variable, name),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ForwardRule {
    pub url: String,
    pub filter: Option<ForwardFilter>,
    /// `as prefix-*`
    pub prefix: Option<String>,
    pub config: Vec<ConfigArg>,
    pub scope: ScopeId,
}

#[derive(Clone, Debug)]
pub struct ImportRule {
    pub url: String,
    pub scope: ScopeId,
}
