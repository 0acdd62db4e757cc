//! Introspection built-ins.
//!
//! Built-ins live in the dedicated built-in descriptor, in the global address
//! space below the private boundary. They are the last candidate of every
//! full lookup, so a stylesheet can shadow them with its own `@function`.

use sass_ir::{Address, ScopeArena, ScopeId, SlotKind, StringInterner, Value};

use crate::environment::{Callable, RuntimeEnvironment};
use crate::errors::{content_outside_mixin, private_access, type_mismatch, unknown_module};
use crate::evaluator::Evaluator;
use crate::resolver::NamespacedLookup;
use crate::EvalResult;

/// Signature of a built-in: evaluator, calling scope, arguments padded with
/// `null` up to `params.len()`.
pub type BuiltinRun = fn(&Evaluator, ScopeId, &[Value]) -> EvalResult;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub params: &'static [&'static str],
    /// Number of leading parameters without a default.
    pub required: usize,
    pub run: BuiltinRun,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "variable-exists",
        params: &["name"],
        required: 1,
        run: variable_exists,
    },
    Builtin {
        name: "global-variable-exists",
        params: &["name", "module"],
        required: 1,
        run: global_variable_exists,
    },
    Builtin {
        name: "function-exists",
        params: &["name", "module"],
        required: 1,
        run: function_exists,
    },
    Builtin {
        name: "mixin-exists",
        params: &["name", "module"],
        required: 1,
        run: mixin_exists,
    },
    Builtin {
        name: "content-exists",
        params: &[],
        required: 0,
        run: content_exists,
    },
    Builtin {
        name: "if",
        params: &["condition", "if-true", "if-false"],
        required: 3,
        run: if_,
    },
    Builtin {
        name: "inspect",
        params: &["value"],
        required: 1,
        run: inspect,
    },
];

/// Declare every built-in, fill its slot and seal the built-in region.
pub(crate) fn install(arena: &mut ScopeArena, env: &mut RuntimeEnvironment, interner: &StringInterner) {
    for builtin in BUILTINS {
        let name = interner.intern(builtin.name);
        if let Address::Global(offset) = arena.declare(ScopeId::BUILTINS, SlotKind::Function, name) {
            env.define_builtin(offset, Callable::Builtin(*builtin));
        }
    }
    arena.seal_builtins();
    env.seal(arena);
}

fn string_arg<'a>(value: &'a Value) -> Result<&'a str, crate::EvalError> {
    value
        .as_str()
        .ok_or_else(|| type_mismatch("string", value.type_name()))
}

/// Shared body of the `*-exists` functions.
fn member_exists(
    eval: &Evaluator,
    kind: SlotKind,
    scope: ScopeId,
    name: &Value,
    module: &Value,
    global: bool,
) -> EvalResult {
    let interner = eval.interner();
    let name = interner.intern(string_arg(name)?);
    let resolver = eval.resolver();

    if !module.is_null() {
        let namespace = string_arg(module)?;
        return match resolver.resolve_namespaced(kind, interner.intern(namespace), name, scope) {
            NamespacedLookup::Found(_) => Ok(Value::Bool(true)),
            NamespacedLookup::Missing => Ok(Value::Bool(false)),
            NamespacedLookup::Private => Err(private_access(interner.lookup(name))),
            NamespacedLookup::UnknownNamespace => Err(unknown_module(namespace)),
        };
    }

    let found = if global {
        let root = eval.arena().root_of(scope);
        resolver.resolve(kind, name, root, false)
    } else {
        resolver.resolve(kind, name, scope, true)
    };
    Ok(Value::Bool(found.is_some()))
}

fn variable_exists(eval: &Evaluator, scope: ScopeId, args: &[Value]) -> EvalResult {
    member_exists(eval, SlotKind::Variable, scope, &args[0], &Value::Null, false)
}

fn global_variable_exists(eval: &Evaluator, scope: ScopeId, args: &[Value]) -> EvalResult {
    member_exists(eval, SlotKind::Variable, scope, &args[0], &args[1], true)
}

fn function_exists(eval: &Evaluator, scope: ScopeId, args: &[Value]) -> EvalResult {
    member_exists(eval, SlotKind::Function, scope, &args[0], &args[1], false)
}

fn mixin_exists(eval: &Evaluator, scope: ScopeId, args: &[Value]) -> EvalResult {
    member_exists(eval, SlotKind::Mixin, scope, &args[0], &args[1], false)
}

fn content_exists(eval: &Evaluator, _scope: ScopeId, _args: &[Value]) -> EvalResult {
    match eval.env().content() {
        Some(content) => Ok(Value::Bool(content.is_some())),
        None => Err(content_outside_mixin()),
    }
}

fn if_(_eval: &Evaluator, _scope: ScopeId, args: &[Value]) -> EvalResult {
    Ok(if args[0].is_truthy() {
        args[1].clone()
    } else {
        args[2].clone()
    })
}

fn inspect(_eval: &Evaluator, _scope: ScopeId, args: &[Value]) -> EvalResult {
    Ok(Value::string(args[0].to_string()))
}
