//! Statement execution.

use std::sync::Arc;

use sass_ir::ast::{Assignment, Block, Include, Stmt};
use sass_ir::{Address, SlotKind, Value};

use super::{Evaluator, Flow};
use crate::diagnostics::FrameKind;
use crate::environment::{Callable, ContentBlock, FrameContent};
use crate::errors::{content_outside_mixin, type_mismatch, undefined_mixin, EvalError};

impl Evaluator {
    /// Execute a block inside its own activation.
    pub(crate) fn exec_block(&mut self, block: &Block, content: FrameContent) -> Result<Flow, EvalError> {
        self.with_activation(block.scope, content, |scoped| scoped.exec_stmts(&block.stmts))
    }

    /// Execute statements in the current activation, stopping at `@return`.
    pub(crate) fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Flow, EvalError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.exec_stmt(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, EvalError> {
        match stmt {
            Stmt::Assign(assignment) => self.exec_assign(assignment)?,
            Stmt::Declaration {
                property, value, ..
            } => {
                let value = self.eval_expr(value)?;
                self.emit(property, value)?;
            }
            Stmt::StyleRule { selector, body } => {
                let selector = match self.selectors.last() {
                    Some(parent) => format!("{parent} {selector}"),
                    None => selector.clone(),
                };
                self.selectors.push(selector);
                let result = self.exec_block(body, FrameContent::Inherit);
                self.selectors.pop();
                return result;
            }
            Stmt::If { clauses, otherwise } => {
                for (condition, block) in clauses {
                    if self.eval_expr(condition)?.is_truthy() {
                        return self.exec_block(block, FrameContent::Inherit);
                    }
                }
                if let Some(block) = otherwise {
                    return self.exec_block(block, FrameContent::Inherit);
                }
            }
            Stmt::For {
                variable,
                from,
                to,
                inclusive,
                body,
            } => {
                let from = self.loop_bound(from)?;
                let to = self.loop_bound(to)?;
                return self.exec_for(*variable, from, to, *inclusive, body);
            }
            Stmt::Each {
                variable,
                list,
                body,
            } => {
                let list = self.eval_expr(list)?;
                for item in list.iter_list() {
                    if let Flow::Return(value) = self.exec_iteration(body, *variable, item.clone())? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::While { condition, body } => {
                while self.eval_expr(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.exec_block(body, FrameContent::Inherit)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::Function(decl) => {
                let callable = Callable::User(Arc::clone(decl));
                self.env
                    .set_callable(SlotKind::Function, decl.address, callable)?;
            }
            Stmt::Mixin(decl) => {
                let callable = Callable::User(Arc::clone(decl));
                self.env.set_callable(SlotKind::Mixin, decl.address, callable)?;
            }
            Stmt::Return(value) => return Ok(Flow::Return(self.eval_expr(value)?)),
            Stmt::Include(include) => self.exec_include(include)?,
            Stmt::Content { .. } => self.exec_content()?,
            Stmt::Use(rule) => self.eval_use(rule)?,
            Stmt::Forward(rule) => self.eval_forward(rule)?,
            Stmt::Import(rule) => self.eval_import(rule)?,
        }
        Ok(Flow::Normal)
    }

    fn number(&mut self, expr: &sass_ir::ast::Expr) -> Result<f64, EvalError> {
        let value = self.eval_expr(expr)?;
        value
            .as_number()
            .ok_or_else(|| type_mismatch("number", value.type_name()))
    }

    /// A `@for` bound: a finite number, truncated.
    fn loop_bound(&mut self, expr: &sass_ir::ast::Expr) -> Result<f64, EvalError> {
        let n = self.number(expr)?;
        if n.is_finite() {
            Ok(n.trunc())
        } else {
            Err(type_mismatch("finite number", &n.to_string()))
        }
    }

    fn exec_assign(&mut self, assignment: &Assignment) -> Result<(), EvalError> {
        let configured = if assignment.guarded {
            self.configured_value(assignment)
        } else {
            None
        };

        // `!default` on a slot that already holds a value skips the expression.
        if assignment.guarded
            && configured.is_none()
            && self
                .env
                .variable(assignment.address)
                .is_some_and(|current| !current.is_null())
        {
            return Ok(());
        }

        let value = match configured {
            Some(value) => value,
            None => self.eval_expr(&assignment.value)?,
        };
        self.env
            .set_variable(assignment.address, value, assignment.guarded)?;
        Ok(())
    }

    fn exec_for(
        &mut self,
        variable: Address,
        from: f64,
        to: f64,
        inclusive: bool,
        body: &Block,
    ) -> Result<Flow, EvalError> {
        let step = if to >= from { 1.0 } else { -1.0 };
        let in_range = |i: f64| match (step > 0.0, inclusive) {
            (true, true) => i <= to,
            (true, false) => i < to,
            (false, true) => i >= to,
            (false, false) => i > to,
        };
        let mut i = from;
        while in_range(i) {
            if let Flow::Return(value) = self.exec_iteration(body, variable, Value::Number(i))? {
                return Ok(Flow::Return(value));
            }
            i += step;
        }
        Ok(Flow::Normal)
    }

    /// One loop iteration: a fresh activation with the loop variable bound.
    fn exec_iteration(&mut self, body: &Block, variable: Address, value: Value) -> Result<Flow, EvalError> {
        self.with_activation(body.scope, FrameContent::Inherit, |scoped| {
            scoped.env.set_variable(variable, value, false)?;
            scoped.exec_stmts(&body.stmts)
        })
    }

    fn exec_include(&mut self, include: &Include) -> Result<(), EvalError> {
        let args = self.eval_args(&include.args)?;
        let address = self.resolve_reference(SlotKind::Mixin, &include.callee)?;
        let name = self.interner.lookup(include.callee.name);
        let Some(Callable::User(decl)) = self.env.callable(SlotKind::Mixin, address).cloned() else {
            return Err(undefined_mixin(name));
        };

        let context = match self.env.content() {
            Some(content) => FrameContent::Mixin(content),
            None => FrameContent::Barrier,
        };
        let content = include.content.as_ref().map(|block| {
            Arc::new(ContentBlock {
                block: Arc::clone(block),
                context,
            })
        });
        self.call_user(&decl, args, FrameKind::Mixin, FrameContent::Mixin(content))?;
        Ok(())
    }

    fn exec_content(&mut self) -> Result<(), EvalError> {
        match self.env.content() {
            None => Err(content_outside_mixin()),
            Some(None) => Ok(()),
            Some(Some(content)) => {
                self.exec_block(&content.block, content.context.clone())?;
                Ok(())
            }
        }
    }

    /// Record a declaration for the current module's output. `null` values
    /// produce nothing.
    fn emit(&mut self, property: &str, value: Value) -> Result<(), EvalError> {
        let Some(selector) = self.selectors.last() else {
            return Err(EvalError::new(
                "declarations may only be used within style rules",
            ));
        };
        if value.is_null() {
            return Ok(());
        }
        let declaration = crate::output::CssDeclaration {
            selector: selector.clone(),
            property: property.to_string(),
            value,
        };
        if let Some(frame) = self.module_stack.last_mut() {
            frame.output.push(declaration);
        }
        Ok(())
    }
}
