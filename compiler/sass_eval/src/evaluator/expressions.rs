//! Expression evaluation and callable invocation.

use std::sync::Arc;

use sass_ir::ast::{BinaryOp, CallableDecl, Expr, Reference, UnaryOp};
use sass_ir::{Address, SlotKind, Value};

use super::{Evaluator, Flow};
use crate::diagnostics::{CallFrame, FrameKind};
use crate::environment::{Callable, FrameContent};
use crate::errors::{
    arity_mismatch, private_access, type_mismatch, undefined_function, undefined_mixin,
    undefined_variable, unknown_module, EvalError,
};
use crate::resolver::NamespacedLookup;
use crate::stack::ensure_sufficient_stack;
use crate::EvalResult;

fn undefined(kind: SlotKind, name: &str) -> EvalError {
    match kind {
        SlotKind::Variable => undefined_variable(name),
        SlotKind::Function => undefined_function(name),
        SlotKind::Mixin => undefined_mixin(name),
    }
}

impl Evaluator {
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(reference) => {
                let address = self.resolve_reference(SlotKind::Variable, reference)?;
                self.env
                    .variable(address)
                    .cloned()
                    .ok_or_else(|| undefined_variable(self.interner.lookup(reference.name)))
            }
            Expr::Call { callee, args } => {
                let args = self.eval_args(args)?;
                self.call_function(callee, args)
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
            Expr::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => value
                        .as_number()
                        .map(|n| Value::Number(-n))
                        .ok_or_else(|| type_mismatch("number", value.type_name())),
                }
            }
            Expr::List(items) => Ok(Value::list(self.eval_args(items)?)),
        }
    }

    pub(crate) fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval_expr(arg)).collect()
    }

    /// Address a reference denotes right now.
    ///
    /// Namespaced references go through the namespace's module only. Plain
    /// references use the address baked at parse time when its slot is bound,
    /// and otherwise re-resolve by name from the reference's scope.
    pub(crate) fn resolve_reference(
        &self,
        kind: SlotKind,
        reference: &Reference,
    ) -> Result<Address, EvalError> {
        let name = self.interner.lookup(reference.name);
        let resolver = self.resolver();

        if let Some(namespace) = reference.namespace {
            return match resolver.resolve_namespaced(kind, namespace, reference.name, reference.scope) {
                NamespacedLookup::Found(address) => Ok(address),
                NamespacedLookup::Missing => Err(undefined(kind, name)),
                NamespacedLookup::Private => Err(private_access(name)),
                NamespacedLookup::UnknownNamespace => {
                    Err(unknown_module(self.interner.lookup(namespace)))
                }
            };
        }

        if let Some(address) = reference.address {
            if self.env.is_bound(kind, address) {
                return Ok(address);
            }
        }
        resolver
            .resolve(kind, reference.name, reference.scope, true)
            .ok_or_else(|| undefined(kind, name))
    }

    fn call_function(&mut self, callee: &Reference, mut args: Vec<Value>) -> EvalResult {
        let address = self.resolve_reference(SlotKind::Function, callee)?;
        let name = self.interner.lookup(callee.name);
        let Some(callable) = self.env.callable(SlotKind::Function, address).cloned() else {
            return Err(undefined_function(name));
        };

        match callable {
            Callable::User(decl) => {
                match self.call_user(&decl, args, FrameKind::Function, FrameContent::Barrier)? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal => Err(EvalError::new(format!(
                        "function {name} finished without @return"
                    ))),
                }
            }
            Callable::Builtin(builtin) => {
                if args.len() < builtin.required || args.len() > builtin.params.len() {
                    return Err(arity_mismatch(name, builtin.params.len(), args.len()));
                }
                args.resize(builtin.params.len(), Value::Null);
                (builtin.run)(self, callee.scope, &args)
            }
            Callable::Host { run, .. } => {
                self.call_stack.push(CallFrame::new(FrameKind::Function, name));
                let result = run(self, &args).map_err(|err| self.call_stack.attach_backtrace(err));
                self.call_stack.pop();
                result
            }
        }
    }

    /// Invoke a user-defined function or mixin in a fresh activation of its
    /// body, with parameters bound to `args` or their defaults.
    pub(crate) fn call_user(
        &mut self,
        decl: &Arc<CallableDecl>,
        args: Vec<Value>,
        kind: FrameKind,
        content: FrameContent,
    ) -> Result<Flow, EvalError> {
        let name = self.interner.lookup(decl.name);
        if args.len() > decl.params.len() {
            return Err(arity_mismatch(name, decl.params.len(), args.len()));
        }

        self.call_stack.push(CallFrame::new(kind, name));
        let result = ensure_sufficient_stack(|| {
            self.with_activation(decl.body.scope, content, |scoped| {
                let mut args = args.into_iter();
                for param in &decl.params {
                    let value = match (args.next(), &param.default) {
                        (Some(value), _) => value,
                        (None, Some(default)) => scoped.eval_expr(default)?,
                        (None, None) => {
                            return Err(EvalError::new(format!(
                                "missing argument ${} for {name}",
                                scoped.interner.lookup(param.name)
                            )));
                        }
                    };
                    scoped.env.set_variable(param.address, value, false)?;
                }
                scoped.exec_stmts(&decl.body.stmts)
            })
        });
        let result = result.map_err(|err| self.call_stack.attach_backtrace(err));
        self.call_stack.pop();
        result
    }

    fn eval_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> EvalResult {
        let left = self.eval_expr(lhs)?;
        match op {
            BinaryOp::And if !left.is_truthy() => return Ok(left),
            BinaryOp::Or if left.is_truthy() => return Ok(left),
            BinaryOp::And | BinaryOp::Or => return self.eval_expr(rhs),
            _ => {}
        }
        let right = self.eval_expr(rhs)?;

        match op {
            BinaryOp::Eq => return Ok(Value::Bool(left == right)),
            BinaryOp::NotEq => return Ok(Value::Bool(left != right)),
            BinaryOp::Add
                if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) =>
            {
                return Ok(Value::string(format!("{left}{right}")));
            }
            _ => {}
        }

        let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
            let offender = if left.as_number().is_none() { &left } else { &right };
            return Err(type_mismatch("number", offender.type_name()));
        };
        Ok(match op {
            BinaryOp::Add => Value::Number(a + b),
            BinaryOp::Sub => Value::Number(a - b),
            BinaryOp::Mul => Value::Number(a * b),
            BinaryOp::Div => Value::Number(a / b),
            BinaryOp::Lt => Value::Bool(a < b),
            BinaryOp::LtEq => Value::Bool(a <= b),
            BinaryOp::Gt => Value::Bool(a > b),
            BinaryOp::GtEq => Value::Bool(a >= b),
            // Handled before the operands are coerced to numbers.
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::And | BinaryOp::Or => Value::Null,
        })
    }
}
