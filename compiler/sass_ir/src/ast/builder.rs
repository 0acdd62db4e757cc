//! Programmatic stylesheet construction.
//!
//! `StylesheetBuilder` stands in for the grammar parser: it walks "source"
//! expressed as Rust calls, opens the same scopes a parser would, asks the
//! [`ScopeAllocator`] for addresses, and bakes them into the tree. Embedders
//! without a parser and the test suites build stylesheets with it.
//!
//! ```text
//! let mut b = StylesheetBuilder::new(&interner, &mut arena, root);
//! b.assign_default("size", b.num(12.0));
//! b.mixin("pad", &[("n", None)], |b| {
//!     let n = b.var("n");
//!     b.declaration("padding", n);
//! });
//! let sheet = b.finish();
//! ```

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::ast::{
    Assignment, BinaryOp, Block, CallableDecl, ConfigArg, Expr, ForwardFilter, ForwardRule,
    ImportRule, Include, MemberSet, Param, Reference, Stmt, Stylesheet, UseNamespace, UseRule,
};
use crate::scope::{ScopeAllocator, ScopeArena, ScopeFlags};
use crate::{Name, ScopeId, SlotKind, StringInterner, Value};

/// Builds a [`Stylesheet`] while allocating addresses like a parser.
pub struct StylesheetBuilder<'a> {
    interner: &'a StringInterner,
    alloc: ScopeAllocator<'a>,
    root: ScopeId,
    blocks: Vec<Vec<Stmt>>,
}

impl<'a> StylesheetBuilder<'a> {
    /// Start a stylesheet whose top-level statements live in `root`.
    ///
    /// `root` is a root descriptor for modules and entry points, or an
    /// import-transparent descriptor for `@import`ed files.
    pub fn new(interner: &'a StringInterner, arena: &'a mut ScopeArena, root: ScopeId) -> Self {
        StylesheetBuilder {
            interner,
            alloc: ScopeAllocator::new(arena, root),
            root,
            blocks: vec![Vec::new()],
        }
    }

    /// Finish and return the stylesheet.
    pub fn finish(mut self) -> Stylesheet {
        let body = self.blocks.pop().unwrap_or_default();
        Stylesheet {
            root: self.root,
            body,
        }
    }

    /// Intern an identifier.
    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Scope statements are currently added to.
    pub fn current_scope(&self) -> ScopeId {
        self.alloc.current()
    }

    fn push(&mut self, stmt: Stmt) {
        if let Some(block) = self.blocks.last_mut() {
            block.push(stmt);
        }
    }

    fn block(&mut self, flags: ScopeFlags, f: impl FnOnce(&mut Self)) -> Block {
        let scope = self.alloc.enter(flags);
        self.blocks.push(Vec::new());
        f(self);
        let stmts = self.blocks.pop().unwrap_or_default();
        self.alloc.exit();
        Block { scope, stmts }
    }

    // Expressions

    pub fn num(&self, n: f64) -> Expr {
        Expr::Literal(Value::Number(n))
    }

    pub fn string(&self, s: &str) -> Expr {
        Expr::Literal(Value::string(s))
    }

    pub fn boolean(&self, b: bool) -> Expr {
        Expr::Literal(Value::Bool(b))
    }

    pub fn null(&self) -> Expr {
        Expr::Literal(Value::Null)
    }

    pub fn list(&self, items: Vec<Expr>) -> Expr {
        Expr::List(items)
    }

    pub fn binary(&self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn reference(&self, kind: SlotKind, namespace: Option<&str>, name: &str) -> Reference {
        let name = self.name(name);
        let namespace = namespace.map(|ns| self.name(ns));
        let address = if namespace.is_none() {
            self.alloc.find_address(kind, name, true)
        } else {
            None
        };
        Reference {
            name,
            namespace,
            scope: self.current_scope(),
            address,
        }
    }

    /// `$name`
    pub fn var(&self, name: &str) -> Expr {
        Expr::Variable(self.reference(SlotKind::Variable, None, name))
    }

    /// `ns.$name`
    pub fn ns_var(&self, namespace: &str, name: &str) -> Expr {
        Expr::Variable(self.reference(SlotKind::Variable, Some(namespace), name))
    }

    /// `name(args...)`
    pub fn call(&self, name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            callee: self.reference(SlotKind::Function, None, name),
            args,
        }
    }

    /// `ns.name(args...)`
    pub fn ns_call(&self, namespace: &str, name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            callee: self.reference(SlotKind::Function, Some(namespace), name),
            args,
        }
    }

    // Statements

    fn push_assign(&mut self, name: &str, value: Expr, guarded: bool, global: bool) {
        let name = self.name(name);
        let address = self.alloc.assignment_target(name, global);
        let scope = self.current_scope();
        self.push(Stmt::Assign(Assignment {
            name,
            scope,
            address,
            value,
            guarded,
            global,
        }));
    }

    /// `$name: value;`
    pub fn assign(&mut self, name: &str, value: Expr) {
        self.push_assign(name, value, false, false);
    }

    /// `$name: value !default;`
    pub fn assign_default(&mut self, name: &str, value: Expr) {
        self.push_assign(name, value, true, false);
    }

    /// `$name: value !global;`
    pub fn assign_global(&mut self, name: &str, value: Expr) {
        self.push_assign(name, value, false, true);
    }

    /// `property: value;`
    pub fn declaration(&mut self, property: &str, value: Expr) {
        let scope = self.current_scope();
        self.push(Stmt::Declaration {
            property: property.to_string(),
            value,
            scope,
        });
    }

    /// `selector { ... }`
    pub fn style_rule(&mut self, selector: &str, f: impl FnOnce(&mut Self)) {
        let body = self.block(ScopeFlags::empty(), f);
        self.push(Stmt::StyleRule {
            selector: selector.to_string(),
            body,
        });
    }

    /// `@if condition { ... }`
    pub fn if_(&mut self, condition: Expr, then: impl FnOnce(&mut Self)) {
        let block = self.block(ScopeFlags::PERMEABLE, then);
        self.push(Stmt::If {
            clauses: vec![(condition, block)],
            otherwise: None,
        });
    }

    /// `@if condition { ... } @else { ... }`
    pub fn if_else(
        &mut self,
        condition: Expr,
        then: impl FnOnce(&mut Self),
        otherwise: impl FnOnce(&mut Self),
    ) {
        let then = self.block(ScopeFlags::PERMEABLE, then);
        let otherwise = self.block(ScopeFlags::PERMEABLE, otherwise);
        self.push(Stmt::If {
            clauses: vec![(condition, then)],
            otherwise: Some(otherwise),
        });
    }

    /// `@for $var from <from> through <to>` (`inclusive`) or `... to <to>`.
    pub fn for_(
        &mut self,
        var: &str,
        from: Expr,
        to: Expr,
        inclusive: bool,
        f: impl FnOnce(&mut Self),
    ) {
        let var = self.name(var);
        let mut variable = None;
        let body = self.block(ScopeFlags::PERMEABLE, |b| {
            variable = Some(b.alloc.declare_variable(var));
            f(b);
        });
        if let Some(variable) = variable {
            self.push(Stmt::For {
                variable,
                from,
                to,
                inclusive,
                body,
            });
        }
    }

    /// `@each $var in <list>`
    pub fn each(&mut self, var: &str, list: Expr, f: impl FnOnce(&mut Self)) {
        let var = self.name(var);
        let mut variable = None;
        let body = self.block(ScopeFlags::PERMEABLE, |b| {
            variable = Some(b.alloc.declare_variable(var));
            f(b);
        });
        if let Some(variable) = variable {
            self.push(Stmt::Each {
                variable,
                list,
                body,
            });
        }
    }

    /// `@while condition { ... }`
    pub fn while_(&mut self, condition: Expr, f: impl FnOnce(&mut Self)) {
        let body = self.block(ScopeFlags::PERMEABLE, f);
        self.push(Stmt::While { condition, body });
    }

    fn callable(
        &mut self,
        kind: SlotKind,
        name: &str,
        params: &[(&str, Option<Expr>)],
        f: impl FnOnce(&mut Self),
    ) -> Arc<CallableDecl> {
        let name = self.name(name);
        // Declared before the body so recursive references bake the address.
        let address = match kind {
            SlotKind::Mixin => self.alloc.declare_mixin(name),
            _ => self.alloc.declare_function(name),
        };
        let mut declared = Vec::with_capacity(params.len());
        let body = self.block(ScopeFlags::CALLABLE, |b| {
            for (param, default) in params {
                let param = b.name(param);
                declared.push(Param {
                    name: param,
                    address: b.alloc.declare_variable(param),
                    default: default.clone(),
                });
            }
            f(b);
        });
        Arc::new(CallableDecl {
            name,
            address,
            params: declared,
            body,
        })
    }

    /// `@function name(params) { ... }`
    pub fn function(
        &mut self,
        name: &str,
        params: &[(&str, Option<Expr>)],
        f: impl FnOnce(&mut Self),
    ) {
        let decl = self.callable(SlotKind::Function, name, params, f);
        self.push(Stmt::Function(decl));
    }

    /// `@mixin name(params) { ... }`
    pub fn mixin(&mut self, name: &str, params: &[(&str, Option<Expr>)], f: impl FnOnce(&mut Self)) {
        let decl = self.callable(SlotKind::Mixin, name, params, f);
        self.push(Stmt::Mixin(decl));
    }

    /// `@return value;`
    pub fn return_(&mut self, value: Expr) {
        self.push(Stmt::Return(value));
    }

    /// `@include name(args);`
    pub fn include(&mut self, name: &str, args: Vec<Expr>) {
        let callee = self.reference(SlotKind::Mixin, None, name);
        self.push(Stmt::Include(Include {
            callee,
            args,
            content: None,
        }));
    }

    /// `@include ns.name(args);`
    pub fn ns_include(&mut self, namespace: &str, name: &str, args: Vec<Expr>) {
        let callee = self.reference(SlotKind::Mixin, Some(namespace), name);
        self.push(Stmt::Include(Include {
            callee,
            args,
            content: None,
        }));
    }

    /// `@include name(args) { content }`
    pub fn include_with_content(
        &mut self,
        name: &str,
        args: Vec<Expr>,
        content: impl FnOnce(&mut Self),
    ) {
        let callee = self.reference(SlotKind::Mixin, None, name);
        let content = self.block(ScopeFlags::empty(), content);
        self.push(Stmt::Include(Include {
            callee,
            args,
            content: Some(Arc::new(content)),
        }));
    }

    /// `@content;`
    pub fn content(&mut self) {
        let scope = self.current_scope();
        self.push(Stmt::Content { scope });
    }

    fn config(&self, config: &[(&str, Expr, bool)]) -> Vec<ConfigArg> {
        config
            .iter()
            .map(|(name, value, guarded)| ConfigArg {
                name: self.name(name),
                value: value.clone(),
                guarded: *guarded,
            })
            .collect()
    }

    /// `@use "url" [as ns | as *] [with (...)]`.
    ///
    /// `namespace` is `None` for the default namespace and `Some("*")` for
    /// `as *`. Config entries are `(name, value, guarded)`.
    pub fn use_(&mut self, url: &str, namespace: Option<&str>, config: &[(&str, Expr, bool)]) {
        let namespace = match namespace {
            None => UseNamespace::Default,
            Some("*") => UseNamespace::Global,
            Some(ns) => UseNamespace::Named(self.name(ns)),
        };
        let config = self.config(config);
        let scope = self.current_scope();
        self.push(Stmt::Use(UseRule {
            url: url.to_string(),
            namespace,
            config,
            scope,
        }));
    }

    /// Build a `show`/`hide` member set. Variables are spelled with `$`.
    pub fn members(&self, members: &[&str]) -> MemberSet {
        let mut variables = FxHashSet::default();
        let mut callables = FxHashSet::default();
        for member in members {
            match member.strip_prefix('$') {
                Some(var) => variables.insert(self.name(var)),
                None => callables.insert(self.name(member)),
            };
        }
        MemberSet {
            variables,
            callables,
        }
    }

    /// `@forward "url" [show|hide ...] [as prefix-*] [with (...)]`.
    pub fn forward(
        &mut self,
        url: &str,
        filter: Option<ForwardFilter>,
        prefix: Option<&str>,
        config: &[(&str, Expr, bool)],
    ) {
        let config = self.config(config);
        let scope = self.current_scope();
        self.push(Stmt::Forward(ForwardRule {
            url: url.to_string(),
            filter,
            prefix: prefix.map(str::to_string),
            config,
            scope,
        }));
    }

    /// `@import "url";`
    pub fn import(&mut self, url: &str) {
        let scope = self.current_scope();
        self.push(Stmt::Import(ImportRule {
            url: url.to_string(),
            scope,
        }));
    }
}
