use super::*;
use pretty_assertions::assert_eq;
use sass_ir::{ScopeFlags, SlotKind};
use std::panic::{catch_unwind, AssertUnwindSafe};

fn evaluator_with_scope() -> (Evaluator, ScopeId) {
    let mut eval = Evaluator::builder().build();
    let root = eval.arena.alloc_root();
    let body = eval.arena.alloc(Some(root), ScopeFlags::CALLABLE);
    let name = eval.interner.intern("x");
    eval.arena.declare(body, SlotKind::Variable, name);
    (eval, body)
}

#[test]
fn guard_pops_on_normal_exit() {
    let (mut eval, body) = evaluator_with_scope();
    {
        let scoped = eval
            .scoped(body, FrameContent::Inherit)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(scoped.env.depth(), 1);
        assert_eq!(scoped.env.lengths().variables, 1);
    }
    assert_eq!(eval.env.depth(), 0);
    assert_eq!(eval.env.lengths().variables, 0);
    assert!(!eval.arena.get(body).is_active());
}

#[test]
fn guard_pops_on_error() {
    let (mut eval, body) = evaluator_with_scope();
    let result: Result<(), EvalError> = eval.with_activation(body, FrameContent::Inherit, |s| {
        s.with_activation(body, FrameContent::Inherit, |_| Err(EvalError::new("boom")))
    });
    assert_eq!(result.map_err(|e| e.message), Err("boom".to_string()));
    assert_eq!(eval.env.depth(), 0);
    assert_eq!(eval.env.lengths().variables, 0);
}

#[test]
fn guard_pops_on_nested_panic() {
    let (mut eval, body) = evaluator_with_scope();
    let result = catch_unwind(AssertUnwindSafe(|| {
        let _: Result<(), EvalError> = eval.with_activation(body, FrameContent::Inherit, |s1| {
            s1.with_activation(body, FrameContent::Inherit, |s2| {
                assert_eq!(s2.env.depth(), 2);
                panic!("deep panic");
            })
        });
    }));
    assert!(result.is_err());
    assert_eq!(eval.env.depth(), 0);
    assert_eq!(eval.env.lengths().variables, 0);
    assert!(!eval.arena.get(body).is_active());
}
